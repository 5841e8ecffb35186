//! Signed direct-to-Cloudinary image uploads.
//!
//! The upload widget in the product form asks `/cloudinary/sign` to sign
//! its upload parameters, so the API secret never reaches the browser.
//! The signature is the hex SHA-256 of the parameters serialized as
//! `k1=v1&k2=v2` (sorted by key) with the API secret appended.

use std::collections::BTreeMap;

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Parameters the upload API never includes in the signature.
const UNSIGNED_PARAMS: &[&str] = &["file", "cloud_name", "resource_type", "api_key"];

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("params_to_sign is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("params_to_sign must be a JSON object")]
    NotAnObject,
}

/// Parse the widget's `params_to_sign` query value.
///
/// # Errors
///
/// Returns `MediaError` if the value is not a JSON object.
pub fn parse_params(json: &str) -> Result<serde_json::Map<String, Value>, MediaError> {
    match serde_json::from_str::<Value>(json)? {
        Value::Object(map) => Ok(map),
        _ => Err(MediaError::NotAnObject),
    }
}

/// The string that gets hashed, minus the secret.
fn string_to_sign(params: &serde_json::Map<String, Value>) -> String {
    let sorted: BTreeMap<&str, String> = params
        .iter()
        .filter(|(key, _)| !UNSIGNED_PARAMS.contains(&key.as_str()))
        .filter_map(|(key, value)| param_value(value).map(|v| (key.as_str(), v)))
        .filter(|(_, value)| !value.is_empty())
        .collect();

    sorted
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn param_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(param_value)
                .collect::<Vec<_>>()
                .join(","),
        ),
        other => Some(other.to_string()),
    }
}

/// Sign upload parameters with the API secret.
#[must_use]
pub fn sign_params(params: &serde_json::Map<String, Value>, api_secret: &SecretString) -> String {
    let mut hasher = Sha256::new();
    hasher.update(string_to_sign(params).as_bytes());
    hasher.update(api_secret.expose_secret().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_string_to_sign_sorts_and_filters() {
        let params = parse_params(
            r#"{"timestamp":1315060510,"public_id":"sample","file":"data:...","api_key":"123",
                "eager":["w_400,h_300","c_pad"],"folder":"","cloud_name":"demo","source":"uw"}"#,
        )
        .unwrap();

        assert_eq!(
            string_to_sign(&params),
            "eager=w_400,h_300,c_pad&public_id=sample&source=uw&timestamp=1315060510"
        );
    }

    #[test]
    fn test_sign_params_is_sha256_hex() {
        let params = parse_params(r#"{"public_id":"sample","timestamp":1315060510}"#).unwrap();
        let secret = SecretString::from("abcd");

        let signature = sign_params(&params, &secret);
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));

        let expected = hex::encode(Sha256::digest(b"public_id=sample&timestamp=1315060510abcd"));
        assert_eq!(signature, expected);

        let other = sign_params(&params, &SecretString::from("efgh"));
        assert_ne!(signature, other);
    }

    #[test]
    fn test_parse_params_rejects_non_objects() {
        assert!(matches!(parse_params("[1,2]"), Err(MediaError::NotAnObject)));
        assert!(matches!(parse_params("{"), Err(MediaError::InvalidJson(_))));
    }
}
