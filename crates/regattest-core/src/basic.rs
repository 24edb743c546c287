//! Local basic validator.
//!
//! The fallback of last resort when no remote validator can answer. It only
//! checks that the client holds some text, so its verdict is always level 1
//! and its certainty never exceeds 2. That cap keeps fallback results below
//! the attestation threshold.

use crate::evidence::EvidenceBuilder;
use crate::patterns::contains_punctuation;
use crate::types::{RegulationContent, ValidationLevel, ValidationResult};

/// Highest certainty the local validator may report.
pub const FALLBACK_CERTAINTY_CAP: u8 = 2;

/// Why the router ended up at the local validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// Nothing registered at the requested level or below
    NoValidatorRegistered,
    /// The remote validator returned an error or a malformed payload
    ValidatorError,
    /// The remote validator did not answer in time
    Timeout,
    /// The level's circuit breaker is open
    CircuitOpen,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoValidatorRegistered => "no_validator_registered",
            Self::ValidatorError => "validator_error",
            Self::Timeout => "timeout",
            Self::CircuitOpen => "circuit_open",
        }
    }
}

/// Deterministic text-existence validator.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalBasicValidator;

impl LocalBasicValidator {
    pub fn new() -> Self {
        Self
    }

    /// Judge content on text existence alone.
    pub fn validate(&self, content: &RegulationContent) -> ValidationResult {
        let text = content.text.as_str();
        let text_exists = !text.is_empty();

        let evidence = EvidenceBuilder::new()
            .flag("textExists", text_exists)
            .metric("characterCount", text.chars().count())
            .metric("wordCount", text.split_whitespace().count())
            .flag("hasPunctuation", contains_punctuation(text))
            .flag("fallback", true)
            .build();

        let certainty = if text_exists { FALLBACK_CERTAINTY_CAP } else { 1 };

        ValidationResult::new(text_exists, certainty, ValidationLevel::Text).with_evidence(evidence)
    }

    /// Validate and record why the fallback was taken.
    pub fn validate_as_fallback(
        &self,
        content: &RegulationContent,
        reason: FallbackReason,
        requested_level: ValidationLevel,
    ) -> ValidationResult {
        let mut result = self.validate(content);
        result
            .evidence
            .insert("fallbackReason".to_string(), reason.as_str().into());
        result
            .evidence
            .insert("requestedLevel".to_string(), requested_level.as_u8().into());
        result
    }
}
