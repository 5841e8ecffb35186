//! Authentication service.
//!
//! Password registration and login. Passwords are stored as salted
//! Argon2id PHC strings.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::forms::account::{Credentials, Registration};
use crate::models::User;

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(&self, registration: &Registration) -> Result<User, AuthError> {
        if self.users.email_exists(&registration.email).await? {
            return Err(AuthError::UserAlreadyExists);
        }

        let password_hash = hash_password(&registration.password)?;

        // The unique index still guards against a concurrent registration.
        let user = self
            .users
            .create(&registration.username, &registration.email, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, credentials: &Credentials) -> Result<User, AuthError> {
        let (user, password_hash) = self
            .users
            .get_password_hash(&credentials.email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(&credentials.password, &password_hash)?;

        Ok(user)
    }
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
