//! Checkout pages and the payment provider webhook.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;
use tower_sessions::Session;
use tracing::instrument;

use crate::db::CartRepository;
use crate::error::{AppError, Result};
use crate::middleware::{PageContext, RequireUser, flash};
use crate::models::CartSummary;
use crate::services::payments::{self, PaymentEvent, WebhookError};
use crate::state::AppState;

#[derive(Template, WebTemplate)]
#[template(path = "checkout/summary.html")]
pub struct CheckoutSummaryTemplate {
    pub ctx: PageContext,
    pub cart: CartSummary,
}

#[derive(Template, WebTemplate)]
#[template(path = "checkout/success.html")]
pub struct CheckoutSuccessTemplate {
    pub ctx: PageContext,
}

#[derive(Template, WebTemplate)]
#[template(path = "checkout/cancelled.html")]
pub struct CheckoutCancelledTemplate {
    pub ctx: PageContext,
}

/// Order summary before payment.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn summary(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
) -> Result<Response> {
    let cart = CartRepository::new(state.pool()).list_for_user(user.id).await?;
    if cart.is_empty() {
        flash::error(&session, "Your cart is empty").await?;
        return Ok(Redirect::to("/cart").into_response());
    }

    Ok(CheckoutSummaryTemplate {
        ctx: PageContext::load(&session).await?,
        cart,
    }
    .into_response())
}

#[instrument(skip(session))]
pub async fn success(session: Session) -> Result<Response> {
    Ok(CheckoutSuccessTemplate {
        ctx: PageContext::load(&session).await?,
    }
    .into_response())
}

#[instrument(skip(session))]
pub async fn cancelled(session: Session) -> Result<Response> {
    Ok(CheckoutCancelledTemplate {
        ctx: PageContext::load(&session).await?,
    }
    .into_response())
}

/// Payment webhook. Authenticated by its signature header, not by CSRF.
///
/// A completed checkout empties the paying user's cart; every other event
/// is acknowledged and ignored.
#[instrument(skip_all)]
pub async fn process_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let secret = state
        .config()
        .payment_webhook_secret
        .as_ref()
        .ok_or_else(|| AppError::ServiceUnavailable("payments are not configured".to_string()))?;

    let event = verify_and_parse(secret, &headers, &body).map_err(|e| {
        tracing::warn!(error = %e, "Rejected payment webhook");
        AppError::BadRequest(e.to_string())
    })?;

    match event {
        PaymentEvent::CheckoutCompleted {
            user_id,
            checkout_id,
        } => {
            let cleared = CartRepository::new(state.pool())
                .clear_for_user(user_id)
                .await?;
            tracing::info!(%user_id, ?checkout_id, lines = cleared, "Checkout completed, cart cleared");
        }
        PaymentEvent::Ignored { kind } => {
            tracing::debug!(%kind, "Ignoring payment event");
        }
    }

    Ok(Json(json!({ "received": true })).into_response())
}

fn verify_and_parse(
    secret: &secrecy::SecretString,
    headers: &HeaderMap,
    body: &[u8],
) -> std::result::Result<PaymentEvent, WebhookError> {
    let signature = headers
        .get(payments::SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookError::MissingSignature)?;

    payments::verify_signature(secret, signature, body, chrono::Utc::now().timestamp())?;
    payments::parse_event(body)
}
