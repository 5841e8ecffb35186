//! Payment provider webhooks.
//!
//! The provider signs each delivery with a `Stripe-Signature` header of the
//! form `t=<unix seconds>,v1=<hex hmac>`, where the HMAC-SHA256 is computed
//! over `"<t>.<raw body>"` with the endpoint's signing secret. Deliveries
//! older than five minutes are rejected to prevent replay.

use std::collections::HashMap;

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

use shopkeep_core::UserId;

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Maximum age of a signed delivery, in seconds.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Event type sent when a hosted checkout is paid.
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

type HmacSha256 = Hmac<Sha256>;

/// Errors verifying or decoding a webhook delivery.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("missing signature header")]
    MissingSignature,

    #[error("malformed signature header")]
    MalformedSignature,

    #[error("signature timestamp outside tolerance")]
    StaleTimestamp,

    #[error("signature mismatch")]
    SignatureMismatch,

    #[error("invalid event payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

/// Verify a delivery's signature header against its raw body.
///
/// `now` is the current unix time in seconds.
///
/// # Errors
///
/// Returns a `WebhookError` describing why the delivery is not authentic.
pub fn verify_signature(
    secret: &SecretString,
    header: &str,
    payload: &[u8],
    now: i64,
) -> Result<(), WebhookError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            return Err(WebhookError::MalformedSignature);
        };
        match key {
            "t" => {
                timestamp = Some(
                    value
                        .parse::<i64>()
                        .map_err(|_| WebhookError::MalformedSignature)?,
                );
            }
            "v1" => signatures.push(value),
            // Other schemes (e.g. v0 test signatures) are ignored.
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(WebhookError::MalformedSignature)?;
    if signatures.is_empty() {
        return Err(WebhookError::MalformedSignature);
    }
    if (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(WebhookError::StaleTimestamp);
    }

    let mac = signed_payload_mac(secret, timestamp, payload)?;

    let matched = signatures.iter().any(|candidate| {
        hex::decode(candidate).is_ok_and(|bytes| mac.clone().verify_slice(&bytes).is_ok())
    });

    if matched {
        Ok(())
    } else {
        Err(WebhookError::SignatureMismatch)
    }
}

/// Build a signature header for `payload`, as the provider would.
///
/// # Errors
///
/// Returns `WebhookError::MalformedSignature` if the secret cannot key an HMAC.
pub fn signature_header(
    secret: &SecretString,
    timestamp: i64,
    payload: &[u8],
) -> Result<String, WebhookError> {
    let mac = signed_payload_mac(secret, timestamp, payload)?;
    Ok(format!(
        "t={timestamp},v1={}",
        hex::encode(mac.finalize().into_bytes())
    ))
}

fn signed_payload_mac(
    secret: &SecretString,
    timestamp: i64,
    payload: &[u8],
) -> Result<HmacSha256, WebhookError> {
    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
        .map_err(|_| WebhookError::MalformedSignature)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

// =============================================================================
// Events
// =============================================================================

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    kind: String,
    data: RawEventData,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    object: RawEventObject,
}

#[derive(Debug, Deserialize)]
struct RawEventObject {
    id: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

/// A decoded webhook event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEvent {
    /// A checkout was paid; the user's cart should be emptied.
    CheckoutCompleted {
        user_id: UserId,
        checkout_id: Option<String>,
    },
    /// Any event this storefront does not act on.
    Ignored { kind: String },
}

/// Decode a verified delivery body.
///
/// A completed checkout without a usable `metadata.user_id` is reported as
/// `Ignored`, since there is no cart to clear.
///
/// # Errors
///
/// Returns `WebhookError::InvalidPayload` if the body is not an event.
pub fn parse_event(payload: &[u8]) -> Result<PaymentEvent, WebhookError> {
    let event: RawEvent = serde_json::from_slice(payload)?;

    if event.kind != CHECKOUT_COMPLETED {
        return Ok(PaymentEvent::Ignored { kind: event.kind });
    }

    let user_id = event
        .data
        .object
        .metadata
        .get("user_id")
        .and_then(|id| id.parse::<UserId>().ok());

    Ok(match user_id {
        Some(user_id) => PaymentEvent::CheckoutCompleted {
            user_id,
            checkout_id: event.data.object.id,
        },
        None => PaymentEvent::Ignored { kind: event.kind },
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const NOW: i64 = 1_760_000_000;

    fn secret() -> SecretString {
        SecretString::from("whsec_test_4f9a2c7e1b")
    }

    const BODY: &[u8] = br#"{"type":"checkout.session.completed","data":{"object":{"id":"cs_test_1","metadata":{"user_id":"42"}}}}"#;

    #[test]
    fn test_valid_signature_accepted() {
        let header = signature_header(&secret(), NOW, BODY).unwrap();
        assert!(verify_signature(&secret(), &header, BODY, NOW + 10).is_ok());
    }

    #[test]
    fn test_tampered_body_rejected() {
        let header = signature_header(&secret(), NOW, BODY).unwrap();
        let tampered = String::from_utf8(BODY.to_vec()).unwrap().replace("42", "43");
        assert!(matches!(
            verify_signature(&secret(), &header, tampered.as_bytes(), NOW),
            Err(WebhookError::SignatureMismatch)
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let header = signature_header(&SecretString::from("whsec_other"), NOW, BODY).unwrap();
        assert!(matches!(
            verify_signature(&secret(), &header, BODY, NOW),
            Err(WebhookError::SignatureMismatch)
        ));
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let header = signature_header(&secret(), NOW, BODY).unwrap();
        assert!(matches!(
            verify_signature(&secret(), &header, BODY, NOW + SIGNATURE_TOLERANCE_SECS + 1),
            Err(WebhookError::StaleTimestamp)
        ));
        assert!(verify_signature(&secret(), &header, BODY, NOW + SIGNATURE_TOLERANCE_SECS).is_ok());
    }

    #[test]
    fn test_malformed_headers_rejected() {
        for header in ["", "garbage", "t=abc,v1=00", "v1=00", "t=1760000000"] {
            assert!(
                matches!(
                    verify_signature(&secret(), header, BODY, NOW),
                    Err(WebhookError::MalformedSignature)
                ),
                "{header:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_any_matching_v1_accepted() {
        let valid = signature_header(&secret(), NOW, BODY).unwrap();
        let v1 = valid.split_once("v1=").unwrap().1;
        let header = format!("t={NOW},v1=deadbeef,v0=ignored,v1={v1}");
        assert!(verify_signature(&secret(), &header, BODY, NOW).is_ok());
    }

    #[test]
    fn test_parse_checkout_completed() {
        assert_eq!(
            parse_event(BODY).unwrap(),
            PaymentEvent::CheckoutCompleted {
                user_id: UserId::new(42),
                checkout_id: Some("cs_test_1".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_other_events() {
        let body = br#"{"type":"payment_intent.created","data":{"object":{"id":"pi_1"}}}"#;
        assert_eq!(
            parse_event(body).unwrap(),
            PaymentEvent::Ignored {
                kind: "payment_intent.created".to_string()
            }
        );

        let no_user = br#"{"type":"checkout.session.completed","data":{"object":{"metadata":{}}}}"#;
        assert!(matches!(
            parse_event(no_user).unwrap(),
            PaymentEvent::Ignored { .. }
        ));

        assert!(matches!(
            parse_event(b"not json"),
            Err(WebhookError::InvalidPayload(_))
        ));
    }
}
