//! Request identification and tracing spans.
//!
//! Every request carries an `x-request-id`. A client-supplied ID is kept;
//! otherwise a UUID v4 is generated. The ID is echoed on the response and
//! recorded on the request's tracing span.

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Header carrying the request ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuidV4;

impl MakeRequestId for MakeRequestUuidV4 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Request ID of a request, or `"unknown"` before one was assigned.
pub fn request_id_of<B>(request: &Request<B>) -> &str {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Span wrapping one request, tagged with its ID.
pub fn make_request_span(request: &Request<Body>) -> tracing::Span {
    tracing::info_span!(
        "request",
        request_id = %request_id_of(request),
        method = %request.method(),
        uri = %request.uri(),
    )
}
