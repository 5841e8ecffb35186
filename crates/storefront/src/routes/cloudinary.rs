//! Signed media uploads.
//!
//! The product form loads the Cloudinary upload widget, which calls
//! `/cloudinary/sign` for every upload. Only the cloud name and API key are
//! sent to the browser.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::instrument;

use crate::config::StorefrontConfig;
use crate::error::{AppError, Result};
use crate::services::media;
use crate::state::AppState;

/// Public settings the upload widget is initialised with.
#[derive(Debug, Clone)]
pub struct UploadWidget {
    pub cloud_name: String,
    pub api_key: String,
}

impl UploadWidget {
    /// `None` when uploads are not configured; the form then has no image
    /// control.
    #[must_use]
    pub fn from_config(config: &StorefrontConfig) -> Option<Self> {
        config.cloudinary.as_ref().map(|c| Self {
            cloud_name: c.cloud_name.clone(),
            api_key: c.api_key.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SignQuery {
    pub params_to_sign: String,
}

/// Sign the widget's upload parameters. The body is the bare signature.
#[instrument(skip(state, query))]
pub async fn sign(State(state): State<AppState>, Query(query): Query<SignQuery>) -> Result<Response> {
    let cloudinary = state
        .config()
        .cloudinary
        .as_ref()
        .ok_or_else(|| AppError::ServiceUnavailable("media uploads are not configured".to_string()))?;

    let params = media::parse_params(&query.params_to_sign)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    Ok(media::sign_params(&params, &cloudinary.api_secret).into_response())
}
