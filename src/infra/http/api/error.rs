use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::equipment::EquipmentError;
use crate::application::error::ErrorReport;
use crate::application::exercises::ExerciseError;
use crate::application::repos::RepoError;

const SOURCE: &str = "infra::http::api";

/// Machine-readable `error.code` values.
pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const EXPIRED: &str = "expired";
    pub const REVOKED: &str = "revoked";
    pub const FORBIDDEN: &str = "forbidden";
    pub const NOT_FOUND: &str = "not_found";
    pub const DUPLICATE: &str = "duplicate";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const UNKNOWN_EQUIPMENT: &str = "unknown_equipment";
    pub const INTEGRITY: &str = "integrity_error";
    pub const DB_TIMEOUT: &str = "db_timeout";
    pub const REPO: &str = "repo_error";
    pub const AUTH_UNAVAILABLE: &str = "auth_unavailable";
}

/// JSON error returned by every `/api/v2` route:
/// `{"error": {"code", "message", "hint"?}}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    hint: Option<String>,
}

#[derive(Serialize)]
struct Envelope<'a> {
    error: Body<'a>,
}

#[derive(Serialize)]
struct Body<'a> {
    code: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<&'a str>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: &'static str,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message,
            hint,
        }
    }

    pub fn bad_request(message: &'static str, hint: Option<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message, hint)
    }

    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            codes::UNAUTHORIZED,
            "API key required",
            None,
        )
    }

    pub fn forbidden() -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            codes::FORBIDDEN,
            "API key lacks required scope",
            None,
        )
    }

    pub fn not_found(message: &'static str) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message, None)
    }

    fn invalid_input(message: &'static str, field: &str, detail: &str) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            message,
            Some(format!("{field}: {detail}")),
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => Self::not_found("resource not found"),
            RepoError::Pagination(p) => Self::bad_request("Invalid page", Some(p.to_string())),
            RepoError::Duplicate { constraint } => Self::new(
                StatusCode::CONFLICT,
                codes::DUPLICATE,
                "Duplicate record",
                Some(constraint),
            ),
            RepoError::InvalidInput { message } => Self::new(
                StatusCode::BAD_REQUEST,
                codes::INVALID_INPUT,
                "Invalid input",
                Some(message),
            ),
            RepoError::Integrity { message } => Self::new(
                StatusCode::CONFLICT,
                codes::INTEGRITY,
                "Integrity constraint violated",
                Some(message),
            ),
            RepoError::Timeout => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::DB_TIMEOUT,
                "Database timeout",
                None,
            ),
            RepoError::Persistence(message) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::REPO,
                "Persistence error",
                Some(message),
            ),
        }
    }
}

impl From<EquipmentError> for ApiError {
    fn from(err: EquipmentError) -> Self {
        match err {
            EquipmentError::Validation { field, message } => {
                Self::invalid_input("Invalid equipment", field, &message)
            }
            EquipmentError::NotFound(_) => Self::not_found("equipment not found"),
            EquipmentError::Pagination(p) => {
                Self::bad_request("Invalid page", Some(p.to_string()))
            }
            EquipmentError::Repo(repo) => repo.into(),
        }
    }
}

impl From<ExerciseError> for ApiError {
    fn from(err: ExerciseError) -> Self {
        match err {
            ExerciseError::Validation { field, message } => {
                Self::invalid_input("Invalid exercise", field, &message)
            }
            ExerciseError::ExerciseNotFound(_) => Self::not_found("exercise not found"),
            ExerciseError::BaseNotFound(_) => Self::not_found("exercise base not found"),
            ExerciseError::UnknownEquipment(ids) => {
                let ids: Vec<String> = ids.iter().map(i64::to_string).collect();
                Self::new(
                    StatusCode::BAD_REQUEST,
                    codes::UNKNOWN_EQUIPMENT,
                    "Unknown equipment",
                    Some(ids.join(", ")),
                )
            }
            ExerciseError::Repo(repo) => repo.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Envelope {
            error: Body {
                code: self.code,
                message: self.message,
                hint: self.hint.as_deref(),
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        let detail = match self.hint {
            Some(hint) => format!("{}: {hint}", self.code),
            None => format!("{}: {}", self.code, self.message),
        };
        ErrorReport::from_message(SOURCE, self.status, detail).attach(&mut response);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_entities_map_to_not_found() {
        assert_eq!(
            ApiError::from(EquipmentError::NotFound(9)).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(ExerciseError::BaseNotFound(9)).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn unknown_equipment_is_a_bad_request() {
        let err = ApiError::from(ExerciseError::UnknownEquipment(vec![7, 9]));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), codes::UNKNOWN_EQUIPMENT);
        assert_eq!(err.hint.as_deref(), Some("7, 9"));
    }

    #[test]
    fn persistence_failures_are_server_errors() {
        assert_eq!(
            ApiError::from(RepoError::Persistence("boom".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(RepoError::Timeout).code(),
            codes::DB_TIMEOUT
        );
    }

    #[test]
    fn response_carries_report_with_code() {
        let response = ApiError::not_found("equipment not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let report = response
            .extensions()
            .get::<ErrorReport>()
            .expect("report attached");
        assert_eq!(report.messages, vec!["not_found: equipment not found"]);
    }
}
