//! Security headers middleware.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};

/// Middleware that adds security headers to all responses.
///
/// - **Cache-Control: no-store**
///   Nonces and the signed session cookie must never land in a shared cache.
///
/// - **X-Content-Type-Options: nosniff**
///   Responses carry exact content types (plain text nonce, JSON bodies).
///
/// - **X-Frame-Options: DENY**
///   The endpoints have no business inside a frame.
///
/// - **Referrer-Policy: no-referrer**
pub async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert("cache-control", HeaderValue::from_static("no-store"));
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert("referrer-policy", HeaderValue::from_static("no-referrer"));

    response
}
