//! User domain types.

use chrono::{DateTime, Utc};

use shopkeep_core::{Email, UserId, Username};

/// A registered storefront user.
///
/// The password hash never leaves the repository except through
/// `UserRepository::get_password_hash`.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub username: Username,
    pub email: Email,
    pub created_at: DateTime<Utc>,
}
