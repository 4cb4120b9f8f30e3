use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;

use crate::application::api_keys::ApiAuthError;
use crate::domain::api_keys::ApiScope;
use crate::infra::http::middleware::extract_token;
use crate::presentation::views::{ErrorPageView, render_error_response};

use super::HttpState;

/// Gate for the add/edit/delete pages: 401 without a usable key, 403 when
/// the key lacks `equipment_write`.
pub(super) async fn require_equipment_write(
    State(state): State<HttpState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = extract_token(request.headers()) else {
        return unauthorized(&state);
    };

    let principal = match state.api_keys.authenticate(&token).await {
        Ok(principal) => principal,
        Err(ApiAuthError::Unavailable(_)) => {
            return render_error_response(
                state.chrome.minimal(),
                ErrorPageView::unavailable(),
                StatusCode::SERVICE_UNAVAILABLE,
            );
        }
        Err(_) => return unauthorized(&state),
    };

    if principal.requires(ApiScope::EquipmentWrite).is_err() {
        let mut response = render_error_response(
            state.chrome.minimal(),
            ErrorPageView::forbidden(),
            StatusCode::FORBIDDEN,
        );
        response.extensions_mut().insert(principal);
        return response;
    }

    request.extensions_mut().insert(principal.clone());
    let mut response = next.run(request).await;
    response.extensions_mut().insert(principal);
    response
}

fn unauthorized(state: &HttpState) -> Response {
    render_error_response(
        state.chrome.minimal(),
        ErrorPageView::unauthorized(),
        StatusCode::UNAUTHORIZED,
    )
}
