//! Validator capability and the per-level registry.
//!
//! Remote validators for levels 1..3 live behind the [`Validator`] trait.
//! The router looks them up by level; only the local basic validator in
//! `regattest-core` ships with this crate. Remote implementations are
//! external services reached through [`HttpValidator`] (feature `http`).
//!
//! ## Security
//!
//! Remote credentials go through [`ApiCredential`]. See the [`secrets`]
//! module.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use regattest_core::{
    RegulationContent, RegulationSnapshot, ValidationLevel, ValidationOptions, ValidationResult,
    MAX_CERTAINTY, MIN_CERTAINTY,
};

mod registry;
pub mod secrets;

#[cfg(feature = "http")]
mod http;

pub use registry::ValidatorRegistry;
pub use secrets::{ApiCredential, CredentialSource};

#[cfg(feature = "http")]
pub use http::HttpValidator;

/// Errors from remote validators. Never surfaced to callers; the router
/// turns every one of them into a local fallback.
#[derive(Error, Debug)]
pub enum ValidatorError {
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Remote error: {status} - {message}")]
    Remote { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Validator not configured: {0}")]
    NotConfigured(String),
}

/// Request body sent to a remote validator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorPayload {
    /// Always "validate"
    pub action: String,
    pub regulation_id: String,
    pub regulation_title: String,
    pub regulation_category: String,
    pub regulation_jurisdiction: String,
    pub authority_version: String,
    pub client_content: RegulationContent,
    pub options: ValidationOptions,
}

impl ValidatorPayload {
    pub fn new(
        snapshot: &RegulationSnapshot,
        content: &RegulationContent,
        options: &ValidationOptions,
    ) -> Self {
        Self {
            action: "validate".to_string(),
            regulation_id: snapshot.id.clone(),
            regulation_title: snapshot.title.clone(),
            regulation_category: snapshot.category.clone(),
            regulation_jurisdiction: snapshot.jurisdiction.clone(),
            authority_version: snapshot.current_version.clone(),
            client_content: content.clone(),
            options: options.clone(),
        }
    }
}

/// A validator serving one level.
#[async_trait]
pub trait Validator: Send + Sync {
    /// Level this validator is registered under.
    fn level(&self) -> ValidationLevel;

    /// Name for logs.
    fn name(&self) -> &str;

    /// Judge the client's content against the authoritative regulation.
    async fn validate(
        &self,
        payload: &ValidatorPayload,
    ) -> Result<ValidationResult, ValidatorError>;
}

/// Reject remote results whose certainty lies outside 1..=5.
pub fn check_remote_result(result: ValidationResult) -> Result<ValidationResult, ValidatorError> {
    if !(MIN_CERTAINTY..=MAX_CERTAINTY).contains(&result.certainty_level) {
        return Err(ValidatorError::MalformedResponse(format!(
            "certaintyLevel {} outside {}..={}",
            result.certainty_level, MIN_CERTAINTY, MAX_CERTAINTY
        )));
    }
    Ok(result)
}
