//! One-shot flash messages stored in the session.
//!
//! A handler pushes a message before redirecting; the next rendered page
//! drains and shows it through [`PageContext`](super::PageContext).

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::models::session_keys;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    /// Bootstrap alert classes.
    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        match self.level {
            FlashLevel::Success => "alert alert-success",
            FlashLevel::Error => "alert alert-danger",
        }
    }
}

/// Queue a message for the next rendered page.
///
/// # Errors
///
/// Returns an error if the session cannot be read or written.
pub async fn push(
    session: &Session,
    level: FlashLevel,
    message: impl Into<String>,
) -> Result<(), tower_sessions::session::Error> {
    let mut flashes: Vec<Flash> = session
        .get(session_keys::FLASHES)
        .await?
        .unwrap_or_default();
    flashes.push(Flash {
        level,
        message: message.into(),
    });
    session.insert(session_keys::FLASHES, flashes).await
}

/// Queue a success message.
///
/// # Errors
///
/// Returns an error if the session cannot be read or written.
pub async fn success(
    session: &Session,
    message: impl Into<String>,
) -> Result<(), tower_sessions::session::Error> {
    push(session, FlashLevel::Success, message).await
}

/// Queue an error message.
///
/// # Errors
///
/// Returns an error if the session cannot be read or written.
pub async fn error(
    session: &Session,
    message: impl Into<String>,
) -> Result<(), tower_sessions::session::Error> {
    push(session, FlashLevel::Error, message).await
}

/// Remove and return all pending messages.
///
/// # Errors
///
/// Returns an error if the session cannot be read or written.
pub async fn take(session: &Session) -> Result<Vec<Flash>, tower_sessions::session::Error> {
    Ok(session
        .remove::<Vec<Flash>>(session_keys::FLASHES)
        .await?
        .unwrap_or_default())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_flashes_are_drained_once() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);

        success(&session, "Product created").await.unwrap();
        error(&session, "Name is required").await.unwrap();

        let flashes = take(&session).await.unwrap();
        assert_eq!(flashes.len(), 2);
        assert_eq!(flashes[0].message, "Product created");
        assert_eq!(flashes[0].css_class(), "alert alert-success");
        assert_eq!(flashes[1].level, FlashLevel::Error);
        assert_eq!(flashes[1].css_class(), "alert alert-danger");

        assert!(take(&session).await.unwrap().is_empty());
    }
}
