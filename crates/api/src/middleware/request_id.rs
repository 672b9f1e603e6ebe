//! Request ID middleware for request tracing and correlation.
//!
//! An upstream `x-request-id` is honoured when it looks sane; otherwise a
//! UUID v4 is generated. The ID goes into the tracing span, the Sentry scope
//! and the response headers.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_REQUEST_ID_LEN: usize = 128;

/// Accept an upstream request ID only if it is short and plain.
fn sanitize(candidate: &str) -> Option<&str> {
    let ok = !candidate.is_empty()
        && candidate.len() <= MAX_REQUEST_ID_LEN
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    ok.then_some(candidate)
}

/// Middleware that ensures every request has a request ID.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(sanitize)
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    Span::current().record("request_id", &request_id);

    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_accepts_plain_ids() {
        assert_eq!(sanitize("req-123_abc.9"), Some("req-123_abc.9"));
        let uuid = Uuid::new_v4().to_string();
        assert_eq!(sanitize(&uuid), Some(uuid.as_str()));
    }

    #[test]
    fn test_sanitize_rejects_odd_ids() {
        assert_eq!(sanitize(""), None);
        assert_eq!(sanitize("has space"), None);
        assert_eq!(sanitize("line\nbreak"), None);
        assert_eq!(sanitize(&"a".repeat(MAX_REQUEST_ID_LEN + 1)), None);
    }
}
