//! Session layer configuration.
//!
//! Sessions live server-side behind a signed cookie. The signing key is
//! derived from `STOREFRONT_SESSION_SECRET`.

use secrecy::ExposeSecret;
use sha2::{Digest, Sha512};
use tower_sessions::{
    Expiry, SessionManagerLayer, SessionStore,
    cookie::{Key, SameSite, time::Duration},
    service::SignedCookie,
};

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "shopkeep_session";

/// Sessions expire after two weeks without activity.
const SESSION_EXPIRY_SECONDS: i64 = 14 * 24 * 60 * 60;

/// Build the session layer over `store`.
///
/// Production passes a `PostgresStore`, whose `tower_sessions` table is
/// created by `shopkeep-cli migrate`. Tests pass a `MemoryStore`.
#[must_use]
pub fn create_session_layer<Store: SessionStore + Clone>(
    store: Store,
    config: &StorefrontConfig,
) -> SessionManagerLayer<Store, SignedCookie> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(Duration::seconds(
            SESSION_EXPIRY_SECONDS,
        )))
        .with_secure(config.is_https())
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
        .with_signed(signing_key(config))
}

/// Stretch the configured secret to the 64 bytes a cookie key needs.
fn signing_key(config: &StorefrontConfig) -> Key {
    let digest = Sha512::digest(config.session_secret.expose_secret().as_bytes());
    Key::from(digest.as_slice())
}
