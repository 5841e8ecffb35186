//! CSRF protection for state-changing requests.
//!
//! Each session gets a random token, embedded in every form as the `_csrf`
//! field (or sent as the `x-csrf-token` header by scripts). Unsafe methods
//! must echo it back. A mismatch flashes an error and redirects to the
//! page the form came from.
//!
//! The payment webhook is exempt: it is called server-to-server and
//! authenticated by its own signature.

use axum::{
    body::{Body, to_bytes},
    extract::Request,
    http::{HeaderMap, Method, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use tower_sessions::Session;

use super::flash;
use crate::models::session_keys;

/// Form field carrying the token.
pub const CSRF_FIELD: &str = "_csrf";

/// Header carrying the token for script requests.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Paths that skip the check.
pub const CSRF_EXEMPT_PATHS: &[&str] = &["/checkout/process_payment"];

/// Message shown when the check fails.
pub const CSRF_FAILURE_MESSAGE: &str = "The form has expired. Please try again";

/// Largest form body buffered for the token lookup.
const MAX_FORM_BYTES: usize = 2 * 1024 * 1024;

/// Return the session's CSRF token, creating it on first use.
///
/// # Errors
///
/// Returns an error if the session cannot be read or written.
pub async fn csrf_token(session: &Session) -> Result<String, tower_sessions::session::Error> {
    if let Some(token) = session.get::<String>(session_keys::CSRF_TOKEN).await? {
        return Ok(token);
    }

    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    let token = URL_SAFE_NO_PAD.encode(bytes);
    session.insert(session_keys::CSRF_TOKEN, &token).await?;
    Ok(token)
}

/// Reject unsafe requests whose token does not match the session's.
///
/// Must run inside the session layer.
pub async fn csrf_middleware(request: Request, next: Next) -> Response {
    if !requires_token(request.method()) || CSRF_EXEMPT_PATHS.contains(&request.uri().path()) {
        return next.run(request).await;
    }

    let Some(session) = request.extensions().get::<Session>().cloned() else {
        tracing::error!("CSRF middleware is running outside the session layer");
        return reject(None, request.headers()).await;
    };

    let expected = match session.get::<String>(session_keys::CSRF_TOKEN).await {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(error = %e, "Failed to read CSRF token from session");
            None
        }
    };

    let (parts, body) = request.into_parts();

    let header_token = parts
        .headers
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let (submitted, body) = if header_token.is_some() {
        (header_token, body)
    } else if is_form(&parts.headers) {
        let Ok(bytes) = to_bytes(body, MAX_FORM_BYTES).await else {
            return reject(Some(&session), &parts.headers).await;
        };
        let token = url::form_urlencoded::parse(&bytes)
            .find(|(key, _)| key == CSRF_FIELD)
            .map(|(_, value)| value.into_owned());
        (token, Body::from(bytes))
    } else {
        (None, body)
    };

    match (expected, submitted) {
        (Some(expected), Some(submitted)) if constant_time_compare(&expected, &submitted) => {
            next.run(Request::from_parts(parts, body)).await
        }
        _ => {
            tracing::warn!(path = %parts.uri.path(), "CSRF token missing or invalid");
            reject(Some(&session), &parts.headers).await
        }
    }
}

const fn requires_token(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
}

async fn reject(session: Option<&Session>, headers: &HeaderMap) -> Response {
    if let Some(session) = session
        && let Err(e) = flash::error(session, CSRF_FAILURE_MESSAGE).await
    {
        tracing::error!(error = %e, "Failed to store CSRF flash message");
    }
    Redirect::to(&back_location(headers)).into_response()
}

/// Path and query of the `Referer`, or `/`. Never an absolute URL, so the
/// redirect cannot leave the site.
pub(crate) fn back_location(headers: &HeaderMap) -> String {
    headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .and_then(|referer| url::Url::parse(referer).ok())
        .map_or_else(
            || "/".to_string(),
            |url| match url.query() {
                Some(query) => format!("{}?{query}", url.path()),
                None => url.path().to_string(),
            },
        )
}

/// Constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        Router,
        http::{self, HeaderValue, StatusCode},
        middleware,
        routing::{get, post},
    };
    use tower::ServiceExt;
    use tower_sessions::{MemoryStore, SessionManagerLayer};

    use super::*;

    fn app() -> Router {
        Router::new()
            .route(
                "/token",
                get(|session: Session| async move { csrf_token(&session).await.unwrap() }),
            )
            .route("/products/create", post(|body: String| async move { body }))
            .route("/checkout/process_payment", post(|| async { "received" }))
            .layer(middleware::from_fn(csrf_middleware))
            .layer(SessionManagerLayer::new(MemoryStore::default()))
    }

    /// Fetch a token and the session cookie that goes with it.
    async fn session_token(app: &Router) -> (String, String) {
        let response = app
            .clone()
            .oneshot(http::Request::get("/token").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string();
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        (String::from_utf8(body.to_vec()).unwrap(), cookie)
    }

    fn form_post(uri: &str, cookie: Option<&str>, body: String) -> Request {
        let mut builder = http::Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(header::REFERER, "http://localhost:3000/products/create?x=1");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body)).unwrap()
    }

    #[tokio::test]
    async fn test_missing_token_redirects_back() {
        let response = app()
            .oneshot(form_post("/products/create", None, "name=Sencha".into()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/products/create?x=1"
        );
    }

    #[tokio::test]
    async fn test_wrong_token_rejected() {
        let app = app();
        let (_, cookie) = session_token(&app).await;

        let response = app
            .oneshot(form_post(
                "/products/create",
                Some(&cookie),
                "name=Sencha&_csrf=forged".into(),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn test_valid_form_token_passes_body_through() {
        let app = app();
        let (token, cookie) = session_token(&app).await;
        let body = format!("name=Sencha&_csrf={token}");

        let response = app
            .oneshot(form_post("/products/create", Some(&cookie), body.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let echoed = to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(echoed, body.as_bytes());
    }

    #[tokio::test]
    async fn test_valid_header_token_passes() {
        let app = app();
        let (token, cookie) = session_token(&app).await;

        let request = http::Request::post("/products/create")
            .header(header::COOKIE, cookie)
            .header(CSRF_HEADER, token)
            .body(Body::from("{}"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_webhook_path_is_exempt() {
        let request = http::Request::post("/checkout/process_payment")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_safe_methods_skip_check() {
        let response = app()
            .oneshot(http::Request::get("/token").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_back_location() {
        let mut headers = HeaderMap::new();
        assert_eq!(back_location(&headers), "/");

        headers.insert(
            header::REFERER,
            HeaderValue::from_static("https://evil.example/phish"),
        );
        assert_eq!(back_location(&headers), "/phish");

        headers.insert(header::REFERER, HeaderValue::from_static("not a url"));
        assert_eq!(back_location(&headers), "/");
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }
}
