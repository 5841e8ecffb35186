//! Per-page template context.

use chrono::{Local, NaiveDate};
use tower_sessions::Session;

use super::{auth, csrf, flash::Flash};
use crate::models::SessionUser;

/// Values every rendered page needs: who is logged in, pending flash
/// messages, the CSRF token for forms and today's date for the footer.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub user: Option<SessionUser>,
    pub flashes: Vec<Flash>,
    pub csrf_token: String,
    pub today: NaiveDate,
}

impl PageContext {
    /// Load the context, draining pending flash messages.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be read or written.
    pub async fn load(session: &Session) -> Result<Self, tower_sessions::session::Error> {
        let user = auth::current_user(session).await;
        let flashes = super::flash::take(session).await?;
        let csrf_token = csrf::csrf_token(session).await?;

        Ok(Self {
            user,
            flashes,
            csrf_token,
            today: Local::now().date_naive(),
        })
    }

    #[must_use]
    pub const fn is_logged_in(&self) -> bool {
        self.user.is_some()
    }

    /// Footer year.
    #[must_use]
    pub fn year(&self) -> i32 {
        use chrono::Datelike;
        self.today.year()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;
    use crate::middleware::flash;

    #[tokio::test]
    async fn test_load_drains_flashes_and_keeps_token() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        flash::success(&session, "Welcome back").await.unwrap();

        let first = PageContext::load(&session).await.unwrap();
        assert!(!first.is_logged_in());
        assert_eq!(first.flashes.len(), 1);
        assert!(!first.csrf_token.is_empty());

        let second = PageContext::load(&session).await.unwrap();
        assert!(second.flashes.is_empty());
        assert_eq!(second.csrf_token, first.csrf_token);
    }
}
