use std::time::Instant;

use axum::{
    body::Body,
    http::{
        HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode, Uri,
        header::{AUTHORIZATION, AsHeaderName},
    },
    middleware::Next,
    response::Response,
};
use tracing::{error, warn};
use uuid::Uuid;

use crate::application::api_keys::ApiPrincipal;
use crate::application::error::ErrorReport;

const API_KEY_HEADER: &str = "x-api-key";
const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");
const MAX_REQUEST_ID_LEN: usize = 128;

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
}

/// Adopt the caller's `x-request-id` when it is sane, otherwise mint one,
/// and echo it on the response.
pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let ctx = RequestContext {
        request_id: request_id.clone(),
    };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response.extensions_mut().insert(ctx);
    response
}

/// API token from `Authorization: Bearer ...`, falling back to `X-Api-Key`.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    header_str(headers, AUTHORIZATION)
        .and_then(|raw| raw.strip_prefix("Bearer "))
        .or_else(|| header_str(headers, API_KEY_HEADER))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

fn header_str(headers: &HeaderMap, name: impl AsHeaderName) -> Option<&str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// One failed request, as written to the `wger::http::response` target.
struct AccessRecord {
    method: Method,
    uri: Uri,
    status: StatusCode,
    elapsed_ms: u128,
    request_id: String,
    api_key_id: Option<String>,
    source: &'static str,
    chain: Vec<String>,
}

impl AccessRecord {
    fn emit(&self) {
        let detail = self
            .chain
            .first()
            .map(String::as_str)
            .unwrap_or("no diagnostic available");

        if self.status.is_server_error() {
            error!(
                target: "wger::http::response",
                status = self.status.as_u16(),
                method = %self.method,
                uri = %self.uri,
                elapsed_ms = self.elapsed_ms,
                request_id = %self.request_id,
                api_key_id = self.api_key_id.as_deref(),
                source = self.source,
                detail,
                chain = ?self.chain,
                "request failed"
            );
        } else {
            warn!(
                target: "wger::http::response",
                status = self.status.as_u16(),
                method = %self.method,
                uri = %self.uri,
                elapsed_ms = self.elapsed_ms,
                request_id = %self.request_id,
                api_key_id = self.api_key_id.as_deref(),
                source = self.source,
                detail,
                "request rejected"
            );
        }
    }
}

/// Log every 4xx and 5xx response together with its [`ErrorReport`].
pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let started = Instant::now();
    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    // auth layers run inside this one and leave the principal on the response
    let api_key_id = response
        .extensions()
        .get::<ApiPrincipal>()
        .map(|principal| principal.key_id.to_string());
    let (source, chain) = match response.extensions_mut().remove::<ErrorReport>() {
        Some(report) => (report.source, report.messages),
        None => ("unknown", Vec::new()),
    };

    AccessRecord {
        method,
        uri,
        status,
        elapsed_ms: started.elapsed().as_millis(),
        request_id,
        api_key_id,
        source,
        chain,
    }
    .emit();

    response
}

#[cfg(test)]
mod tests {
    use axum::Router;
    use axum::middleware::from_fn;
    use axum::routing::get;
    use tower::ServiceExt;

    use super::*;

    #[test]
    fn bearer_token_wins_over_api_key_header() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer wger_a_b"));
        headers.insert(API_KEY_HEADER, HeaderValue::from_static("wger_c_d"));
        assert_eq!(extract_token(&headers).as_deref(), Some("wger_a_b"));
    }

    #[test]
    fn api_key_header_is_a_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic Zm9vOmJhcg=="));
        headers.insert(API_KEY_HEADER, HeaderValue::from_static(" wger_c_d "));
        assert_eq!(extract_token(&headers).as_deref(), Some("wger_c_d"));
    }

    #[test]
    fn blank_tokens_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer  "));
        assert_eq!(extract_token(&headers), None);
        assert_eq!(extract_token(&HeaderMap::new()), None);
    }

    fn echo_router() -> Router {
        Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(from_fn(set_request_context))
    }

    #[tokio::test]
    async fn request_id_is_echoed_or_minted() {
        let supplied = echo_router()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("x-request-id", "trace-42")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(
            supplied.headers().get(&REQUEST_ID_HEADER),
            Some(&HeaderValue::from_static("trace-42"))
        );

        let minted = echo_router()
            .oneshot(Request::builder().uri("/").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        let id = minted
            .headers()
            .get(&REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .expect("minted id");
        assert!(Uuid::parse_str(id).is_ok());
    }
}
