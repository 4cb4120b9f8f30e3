//! HTML surface: the equipment overview, list and CRUD pages.

mod auth;
mod equipment;

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderMap, StatusCode, header::ACCEPT_LANGUAGE};
use axum::middleware as axum_middleware;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use tracing::warn;

use crate::application::api_keys::ApiKeyService;
use crate::application::chrome::ChromeService;
use crate::application::context::ServiceContext;
use crate::application::equipment::EquipmentService;
use crate::application::error::HttpError;
use crate::application::languages::{LanguageError, LanguageService};
use crate::application::overview::EquipmentOverviewService;
use crate::application::repos::HealthRepo;
use crate::domain::entities::LanguageRecord;
use crate::infra::http::RouterState;
use crate::presentation::routes;
use crate::presentation::views::LayoutChrome;

#[derive(Clone)]
pub struct HttpState {
    pub equipment: Arc<EquipmentService>,
    pub overview: Arc<EquipmentOverviewService>,
    pub languages: Arc<LanguageService>,
    pub chrome: Arc<ChromeService>,
    pub api_keys: Arc<ApiKeyService>,
    pub health: Arc<dyn HealthRepo>,
}

impl HttpState {
    pub fn from_context(context: &ServiceContext) -> Self {
        Self {
            equipment: context.equipment.clone(),
            overview: context.overview.clone(),
            languages: context.languages.clone(),
            chrome: context.chrome.clone(),
            api_keys: context.api_keys.clone(),
            health: context.health.clone(),
        }
    }

    /// Language of the request plus the page chrome rendered in it.
    async fn page_context(
        &self,
        requested: Option<&str>,
        headers: &HeaderMap,
        active_path: &str,
    ) -> Result<(LanguageRecord, LayoutChrome), HttpError> {
        let accept_language = headers
            .get(ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok());
        let language = self
            .languages
            .resolve(requested, accept_language)
            .await
            .map_err(language_to_http)?;
        let chrome = self.chrome.load(&language, active_path).await?;
        Ok((language, chrome))
    }
}

/// Every entry of [`routes::ROUTES`] is registered here; add/edit/delete
/// sit behind the `equipment_write` gate.
pub fn build_web_router(state: RouterState) -> Router<RouterState> {
    let mut public = Router::new().route("/", get(root_redirect));
    let mut crud = Router::new();

    for route in routes::ROUTES {
        match route.name {
            routes::EQUIPMENT_OVERVIEW => {
                public = public.route(route.pattern, get(equipment::overview));
            }
            routes::EQUIPMENT_LIST => {
                public = public.route(route.pattern, get(equipment::list));
            }
            routes::EQUIPMENT_ADD => {
                crud = crud.route(
                    route.pattern,
                    get(equipment::add_form).post(equipment::add_submit),
                );
            }
            routes::EQUIPMENT_EDIT => {
                crud = crud.route(
                    route.pattern,
                    get(equipment::edit_form).post(equipment::edit_submit),
                );
            }
            routes::EQUIPMENT_DELETE => {
                crud = crud.route(
                    route.pattern,
                    get(equipment::delete_confirm).post(equipment::delete_submit),
                );
            }
            other => warn!(route = other, "named route has no handler"),
        }
    }

    let crud = crud.route_layer(axum_middleware::from_fn_with_state(
        state.http.clone(),
        auth::require_equipment_write,
    ));
    public.merge(crud)
}

async fn root_redirect() -> Response {
    Redirect::to(routes::overview_path()).into_response()
}

fn language_to_http(err: LanguageError) -> HttpError {
    HttpError::from_error(
        "infra::http::web::page_context",
        StatusCode::INTERNAL_SERVER_ERROR,
        "Failed to resolve language",
        &err,
    )
}
