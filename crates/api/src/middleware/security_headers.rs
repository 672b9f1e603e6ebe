//! Security headers middleware.
//!
//! The API serves JSON, a couple of plain HTML pages and uploaded images that
//! the storefront embeds from another origin, so resources must stay
//! loadable cross-origin while pages stay unframeable.

use axum::{
    extract::Request,
    http::{
        HeaderName, HeaderValue,
        header::{
            CACHE_CONTROL, CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS,
            X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};

/// Add security headers to all responses.
///
/// Headers applied:
/// - `X-Frame-Options: DENY` - Prevent clickjacking
/// - `X-Content-Type-Options: nosniff` - Prevent MIME sniffing
/// - `Referrer-Policy: no-referrer` - Zero referrer leakage (unsubscribe tokens live in URLs)
/// - `Content-Security-Policy` - No scripts; inline styles for the HTML pages
/// - `Cross-Origin-Resource-Policy: cross-origin` - Storefront may embed uploads
/// - `X-DNS-Prefetch-Control: off`
/// - `Cache-Control: no-store` - Everything except uploaded media
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let cacheable = is_public_media(request.uri().path());
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(REFERRER_POLICY, HeaderValue::from_static("no-referrer"));

    headers.insert(
        CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(
            "default-src 'none'; \
             style-src 'unsafe-inline'; \
             img-src 'self'; \
             base-uri 'none'; \
             form-action 'none'; \
             frame-ancestors 'none'",
        ),
    );

    headers.insert(
        HeaderName::from_static("cross-origin-resource-policy"),
        HeaderValue::from_static("cross-origin"),
    );

    headers.insert(
        HeaderName::from_static("x-dns-prefetch-control"),
        HeaderValue::from_static("off"),
    );

    if !cacheable {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    }

    response
}

/// Uploaded media is served under random, never-reused file names.
fn is_public_media(path: &str) -> bool {
    path.starts_with("/uploads/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_uploads_are_cacheable() {
        assert!(is_public_media("/uploads/products/3f2a.webp"));
        assert!(!is_public_media("/uploads"));
        assert!(!is_public_media("/api/orders"));
        assert!(!is_public_media("/api/unsubscribe/abc"));
    }
}
