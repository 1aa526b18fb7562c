//! XSRF protection for state-changing requests.
//!
//! The token is generated once per process and embedded in every page. A
//! POST, PUT, DELETE or PATCH must carry it in one of three places:
//! the `X-XSRF-Token` header, the `_xsrf_token` field of a url-encoded form,
//! or the `_xsrf_token` query parameter (used by multipart upload forms,
//! whose bodies are not buffered here).

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use uuid::Uuid;

pub const XSRF_HEADER: &str = "X-XSRF-Token";
pub const XSRF_FIELD: &str = "_xsrf_token";

/// Largest url-encoded form body inspected for a token.
const MAX_FORM_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct XsrfToken(Arc<String>);

impl XsrfToken {
    pub fn generate() -> Self {
        Self(Arc::new(Uuid::new_v4().to_string()))
    }

    pub fn value(&self) -> &str {
        &self.0
    }

    fn matches(&self, candidate: &str) -> bool {
        candidate == self.value()
    }
}

fn token_from_pairs(input: &str) -> Option<String> {
    serde_urlencoded::from_str::<Vec<(String, String)>>(input)
        .ok()?
        .into_iter()
        .find(|(key, _)| key == XSRF_FIELD)
        .map(|(_, value)| value)
}

fn content_type_starts_with(request: &Request<Body>, prefix: &str) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with(prefix))
}

pub async fn xsrf_middleware(
    xsrf_token: XsrfToken,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !matches!(
        *request.method(),
        Method::POST | Method::PUT | Method::DELETE | Method::PATCH
    ) {
        return next.run(request).await;
    }

    if let Some(token) = request
        .headers()
        .get(XSRF_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        return if xsrf_token.matches(token) {
            next.run(request).await
        } else {
            xsrf_error_response()
        };
    }

    if let Some(token) = request.uri().query().and_then(token_from_pairs) {
        return if xsrf_token.matches(&token) {
            next.run(request).await
        } else {
            xsrf_error_response()
        };
    }

    if content_type_starts_with(&request, "application/x-www-form-urlencoded") {
        let (parts, body) = request.into_parts();
        let bytes = match axum::body::to_bytes(body, MAX_FORM_BYTES).await {
            Ok(b) => b,
            Err(_) => return xsrf_error_response(),
        };

        let form_token = std::str::from_utf8(&bytes).ok().and_then(token_from_pairs);
        if form_token.is_some_and(|t| xsrf_token.matches(&t)) {
            return next
                .run(Request::from_parts(parts, Body::from(bytes)))
                .await;
        }
    }

    xsrf_error_response()
}

fn xsrf_error_response() -> Response {
    tracing::warn!("Rejected request with invalid or missing XSRF token");
    (StatusCode::FORBIDDEN, "Invalid or missing XSRF token").into_response()
}
