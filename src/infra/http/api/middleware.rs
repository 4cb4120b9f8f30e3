use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::application::api_keys::ApiAuthError;
use crate::infra::http::middleware::extract_token;

use super::error::{ApiError, codes};
use super::state::ApiState;

/// Resolve the API key of a write request. The principal is stored on the
/// request for handlers and copied onto the response for the access log.
pub async fn api_auth(
    State(state): State<ApiState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = match extract_token(request.headers()) {
        Some(value) => value,
        None => return ApiError::unauthorized().into_response(),
    };

    let principal = match state.api_keys.authenticate(&token).await {
        Ok(principal) => principal,
        Err(ApiAuthError::Missing) | Err(ApiAuthError::Invalid) => {
            return ApiError::unauthorized().into_response();
        }
        Err(ApiAuthError::Expired) => {
            return ApiError::new(
                StatusCode::UNAUTHORIZED,
                codes::EXPIRED,
                "API key expired",
                None,
            )
            .into_response();
        }
        Err(ApiAuthError::Revoked) => {
            return ApiError::new(
                StatusCode::UNAUTHORIZED,
                codes::REVOKED,
                "API key revoked",
                None,
            )
            .into_response();
        }
        Err(ApiAuthError::MissingScope(scope)) => {
            return ApiError::new(
                StatusCode::FORBIDDEN,
                codes::FORBIDDEN,
                "API key lacks required scope",
                Some(scope.to_string()),
            )
            .into_response();
        }
        Err(ApiAuthError::Unavailable(_)) => {
            return ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::AUTH_UNAVAILABLE,
                "API key lookup failed",
                None,
            )
            .into_response();
        }
    };

    request.extensions_mut().insert(principal.clone());
    let mut response = next.run(request).await;
    response.extensions_mut().insert(principal);
    response
}
