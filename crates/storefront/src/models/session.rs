//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use shopkeep_core::{Email, UserId, Username};

use super::User;

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    /// User's database ID.
    pub id: UserId,
    /// Display name chosen at registration.
    pub username: Username,
    /// User's email address.
    pub email: Email,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the per-session CSRF token.
    pub const CSRF_TOKEN: &str = "csrf_token";

    /// Key for pending flash messages.
    pub const FLASHES: &str = "flashes";
}
