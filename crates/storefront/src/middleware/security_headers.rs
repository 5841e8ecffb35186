//! Security headers applied to every response.
//!
//! The policy is locked down except where the product form needs the
//! Cloudinary upload widget: its script, iframe, API calls and the images
//! it serves.

use axum::{
    extract::Request,
    http::{
        HeaderName, HeaderValue,
        header::{
            CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};

/// ```text
/// default-src 'none';
/// script-src 'self' https://upload-widget.cloudinary.com;
/// style-src 'self';
/// img-src 'self' data: https://res.cloudinary.com;
/// connect-src 'self' https://api.cloudinary.com;
/// frame-src https://upload-widget.cloudinary.com;
/// object-src 'none';
/// base-uri 'self';
/// form-action 'self';
/// frame-ancestors 'none'
/// ```
const CONTENT_SECURITY_POLICY_VALUE: &str = "default-src 'none'; \
     script-src 'self' https://upload-widget.cloudinary.com; \
     style-src 'self'; \
     font-src 'self'; \
     img-src 'self' data: https://res.cloudinary.com; \
     connect-src 'self' https://api.cloudinary.com; \
     frame-src https://upload-widget.cloudinary.com; \
     object-src 'none'; \
     base-uri 'self'; \
     form-action 'self'; \
     frame-ancestors 'none'";

const PERMISSIONS_POLICY_VALUE: &str = "camera=(), \
     geolocation=(), \
     microphone=(), \
     payment=(), \
     usb=(), \
     browsing-topics=()";

pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    // The CSRF redirect relies on a same-origin Referer.
    headers.insert(
        REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(CONTENT_SECURITY_POLICY_VALUE),
    );
    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static(PERMISSIONS_POLICY_VALUE),
    );
    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin"),
    );

    response
}
