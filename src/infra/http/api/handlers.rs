use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;

use crate::application::api_keys::ApiPrincipal;
use crate::application::exercises::UpdateExerciseCommand;
use crate::domain::api_keys::ApiScope;
use crate::infra::http::parse_id;

use super::EQUIPMENT_COLLECTION_PATH;
use super::error::ApiError;
use super::models::*;
use super::state::ApiState;

#[derive(Debug, Default, Deserialize)]
pub struct LimitOffsetQuery {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Unparseable ids answer like unknown ones.
fn path_id(raw: &str, what: &'static str) -> Result<i64, ApiError> {
    parse_id(raw).ok_or_else(|| ApiError::not_found(what))
}

/// -------- Equipment --------
pub async fn list_equipment(
    State(state): State<ApiState>,
    Query(query): Query<LimitOffsetQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = state.clamp_limit(query.limit);
    let offset = query.offset.unwrap_or(0);

    let page = state.equipment.list_window(limit, offset).await?;

    let body: ListResponse<EquipmentResponse> =
        ListResponse::from_page(EQUIPMENT_COLLECTION_PATH, page);
    Ok(Json(body))
}

pub async fn get_equipment(
    State(state): State<ApiState>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = path_id(&raw_id, "equipment not found")?;
    let equipment = state.equipment.get(id).await?;
    Ok(Json(EquipmentResponse::from(equipment)))
}

/// -------- Exercises --------
pub async fn get_exercise(
    State(state): State<ApiState>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = path_id(&raw_id, "exercise not found")?;
    let exercise = state.exercises.get_exercise(id).await?;
    Ok(Json(ExerciseResponse::from(exercise)))
}

pub async fn patch_exercise(
    State(state): State<ApiState>,
    Extension(principal): Extension<ApiPrincipal>,
    Path(raw_id): Path<String>,
    Json(payload): Json<ExercisePatchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    principal
        .requires(ApiScope::ExerciseWrite)
        .map_err(|_| ApiError::forbidden())?;
    let id = path_id(&raw_id, "exercise not found")?;

    if payload.name.is_none() && payload.description.is_none() {
        return Err(ApiError::bad_request(
            "Nothing to update",
            Some("provide `name` and/or `description`".to_string()),
        ));
    }

    let exercise = state
        .exercises
        .update_exercise(UpdateExerciseCommand {
            id,
            name: payload.name,
            description: payload.description,
        })
        .await?;

    Ok(Json(ExerciseResponse::from(exercise)))
}

pub async fn get_base_equipment(
    State(state): State<ApiState>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = path_id(&raw_id, "exercise base not found")?;
    let base = state.exercises.get_base(id).await?;
    Ok(Json(ExerciseBaseResponse::from(base)))
}

pub async fn put_base_equipment(
    State(state): State<ApiState>,
    Extension(principal): Extension<ApiPrincipal>,
    Path(raw_id): Path<String>,
    Json(payload): Json<EquipmentSetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    principal
        .requires(ApiScope::ExerciseWrite)
        .map_err(|_| ApiError::forbidden())?;
    let id = path_id(&raw_id, "exercise base not found")?;

    let base = state
        .exercises
        .set_base_equipment(id, &payload.equipment)
        .await?;

    Ok((StatusCode::OK, Json(ExerciseBaseResponse::from(base))))
}
