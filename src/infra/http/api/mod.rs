pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod state;

pub use state::ApiState;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, patch, put},
};

use crate::infra::http::RouterState;

pub const EQUIPMENT_COLLECTION_PATH: &str = "/api/v2/equipment/";

/// Reads are anonymous; only the write routes go through `api_auth`.
pub fn build_api_router(state: RouterState) -> Router<RouterState> {
    let auth = axum_middleware::from_fn_with_state(state.api.clone(), middleware::api_auth);

    Router::new()
        .route(EQUIPMENT_COLLECTION_PATH, get(handlers::list_equipment))
        .route("/api/v2/equipment/{id}/", get(handlers::get_equipment))
        .route(
            "/api/v2/exercise/{id}/",
            get(handlers::get_exercise)
                .merge(patch(handlers::patch_exercise).route_layer(auth.clone())),
        )
        .route(
            "/api/v2/exercise-base/{id}/equipment/",
            get(handlers::get_base_equipment)
                .merge(put(handlers::put_base_equipment).route_layer(auth)),
        )
}
