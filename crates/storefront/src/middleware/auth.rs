//! Authentication extractors.
//!
//! The logged-in user lives in the session under `current_user`. Handlers
//! that need a user take [`RequireUser`]; pages that merely show it read
//! it through the page context.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use super::flash;
use crate::models::{SessionUser, session_keys};

/// Where anonymous visitors are sent.
pub const LOGIN_PATH: &str = "/users/login";

/// Message flashed when a page needs a logged-in user.
pub const PERMISSION_DENIED_MESSAGE: &str = "You do not have permission to be here";

/// Extractor that requires a logged-in user.
///
/// ```rust,ignore
/// async fn cart(RequireUser(user): RequireUser) -> impl IntoResponse {
///     format!("Cart for {}", user.username)
/// }
/// ```
pub struct RequireUser(pub SessionUser);

/// Rejection for [`RequireUser`].
pub enum AuthRejection {
    /// Flash was queued; send the visitor to the login page.
    RedirectToLogin,
    /// No session layer in front of the handler.
    MissingSession,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to(LOGIN_PATH).into_response(),
            Self::MissingSession => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts.extensions.get::<Session>().ok_or_else(|| {
            tracing::error!("RequireUser used outside the session layer");
            AuthRejection::MissingSession
        })?;

        match session.get::<SessionUser>(session_keys::CURRENT_USER).await {
            Ok(Some(user)) => Ok(Self(user)),
            Ok(None) => {
                tracing::debug!(path = %parts.uri.path(), "Anonymous request to protected page");
                if let Err(e) = flash::error(session, PERMISSION_DENIED_MESSAGE).await {
                    tracing::error!(error = %e, "Failed to store permission flash");
                }
                Err(AuthRejection::RedirectToLogin)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to read session user");
                Err(AuthRejection::RedirectToLogin)
            }
        }
    }
}

/// Read the session user, treating store errors as anonymous.
pub async fn current_user(session: &Session) -> Option<SessionUser> {
    session
        .get::<SessionUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

/// Log a user in.
///
/// The session id is cycled first so a pre-login id cannot be fixed by an
/// attacker.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &SessionUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Log the current user out.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<SessionUser>(session_keys::CURRENT_USER)
        .await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::{
        Router,
        body::Body,
        http::{self, header},
        routing::get,
    };
    use shopkeep_core::{Email, UserId, Username};
    use tower::ServiceExt;
    use tower_sessions::{MemoryStore, SessionManagerLayer};

    use super::*;

    fn user() -> SessionUser {
        SessionUser {
            id: UserId::new(7),
            username: Username::parse("gyokuro").unwrap(),
            email: Email::parse("gyokuro@example.com").unwrap(),
        }
    }

    #[tokio::test]
    async fn test_require_user_redirects_anonymous() {
        let app = Router::new()
            .route(
                "/cart",
                get(|RequireUser(user): RequireUser| async move { user.username.to_string() }),
            )
            .layer(SessionManagerLayer::new(MemoryStore::default()));

        let response = app
            .oneshot(http::Request::get("/cart").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), LOGIN_PATH);
    }

    #[tokio::test]
    async fn test_set_and_clear_current_user() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        assert_eq!(current_user(&session).await, None);

        set_current_user(&session, &user()).await.unwrap();
        assert_eq!(current_user(&session).await, Some(user()));

        clear_current_user(&session).await.unwrap();
        assert_eq!(current_user(&session).await, None);
    }
}
