//! Landing page.

use askama::Template;
use askama_web::WebTemplate;
use axum::response::{IntoResponse, Redirect, Response};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::PageContext;

#[derive(Template, WebTemplate)]
#[template(path = "landing.html")]
pub struct LandingTemplate {
    pub ctx: PageContext,
}

pub async fn root() -> Redirect {
    Redirect::to("/landing")
}

#[instrument(skip(session))]
pub async fn landing(session: Session) -> Result<Response> {
    Ok(LandingTemplate {
        ctx: PageContext::load(&session).await?,
    }
    .into_response())
}
