//! Core types for regulation validation.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::evidence::EvidenceMap;

/// Lowest certainty a merged result may carry and still receive an attestation.
pub const ATTESTATION_MIN_CERTAINTY: u8 = 4;

/// Highest certainty level a validator can report.
pub const MAX_CERTAINTY: u8 = 5;

/// Lowest certainty level a validator can report.
pub const MIN_CERTAINTY: u8 = 1;

/// Default certificate lifetime.
pub const CERTIFICATE_VALIDITY_DAYS: i64 = 90;

/// Returned when a level outside 1..=3 is supplied.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("validation level must be 1, 2 or 3, got {0}")]
pub struct InvalidLevel(pub u8);

/// Validation sophistication tier.
///
/// Serialized as the bare integer (1, 2 or 3) to match the request protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ValidationLevel {
    /// Level 1: static text comparison
    Text,
    /// Level 2: pattern / semi-structured comparison
    Pattern,
    /// Level 3: context-aware comparison
    Context,
}

impl ValidationLevel {
    /// All levels, lowest first.
    pub const ALL: [ValidationLevel; 3] = [Self::Text, Self::Pattern, Self::Context];

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Text => 1,
            Self::Pattern => 2,
            Self::Context => 3,
        }
    }

    /// The next lower level, if any.
    pub fn lower(self) -> Option<Self> {
        match self {
            Self::Context => Some(Self::Pattern),
            Self::Pattern => Some(Self::Text),
            Self::Text => None,
        }
    }

    /// This level followed by every lower level (3 -> 2 -> 1).
    pub fn fallback_chain(self) -> impl Iterator<Item = ValidationLevel> {
        std::iter::successors(Some(self), |level| level.lower())
    }

    /// Validator family that handles this level.
    pub fn validator_type(self) -> ValidatorType {
        match self {
            Self::Text => ValidatorType::Text,
            Self::Pattern => ValidatorType::Pattern,
            Self::Context => ValidatorType::Context,
        }
    }
}

impl Default for ValidationLevel {
    fn default() -> Self {
        Self::Text
    }
}

impl TryFrom<u8> for ValidationLevel {
    type Error = InvalidLevel;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Text),
            2 => Ok(Self::Pattern),
            3 => Ok(Self::Context),
            other => Err(InvalidLevel(other)),
        }
    }
}

impl From<ValidationLevel> for u8 {
    fn from(level: ValidationLevel) -> Self {
        level.as_u8()
    }
}

impl fmt::Display for ValidationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.as_u8())
    }
}

/// Validator family derived from the final validation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorType {
    Text,
    Pattern,
    Context,
}

/// Client-held regulation content being checked.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegulationContent {
    /// Full text of the client's copy
    #[serde(default)]
    pub text: String,

    /// Free-form metadata supplied by the client
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl RegulationContent {
    /// Content with text and no metadata.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: BTreeMap::new(),
        }
    }
}

/// Per-request options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOptions {
    /// Minimum certainty (1..=5) for a positive verdict to stand
    #[serde(default = "default_require_certainty")]
    pub require_certainty: u8,

    /// Whether the response should carry validator evidence
    #[serde(default = "default_true")]
    pub include_evidence: bool,

    /// Whether to ask the version service about drift
    #[serde(default)]
    pub check_version_changes: bool,
}

fn default_require_certainty() -> u8 {
    MIN_CERTAINTY
}

fn default_true() -> bool {
    true
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            require_certainty: default_require_certainty(),
            include_evidence: true,
            check_version_changes: false,
        }
    }
}

/// A request to validate one regulation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRequest {
    /// Identifier of the regulation in the authoritative store
    pub regulation_id: String,

    /// Version the client believes it holds (MAJOR.MINOR.PATCH)
    pub regulation_version: String,

    /// The client's copy
    pub content: RegulationContent,

    /// Minimum level the caller wants
    #[serde(default)]
    pub requested_level: ValidationLevel,

    #[serde(default)]
    pub options: ValidationOptions,
}

/// Authoritative regulation record owned by the regulation store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RegulationSnapshot {
    pub id: String,
    pub title: String,
    pub category: String,
    pub jurisdiction: String,
    pub current_version: String,

    /// Free-form descriptive fields; string values feed text complexity
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl RegulationSnapshot {
    /// Title followed by the metadata's string values.
    pub fn descriptive_text(&self) -> String {
        self.metadata
            .values()
            .filter_map(serde_json::Value::as_str)
            .fold(self.title.clone(), |mut text, value| {
                text.push('\n');
                text.push_str(value);
                text
            })
    }
}

/// Individual factor scores, each 0..=100.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityFactors {
    pub text_complexity: u8,
    pub content_size: u8,
    pub change_frequency: u8,
    pub structural_complexity: u8,
}

/// Complexity assessment and the level it selects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub regulation_id: String,

    /// Final level, never below the requested level
    pub validation_level: ValidationLevel,

    /// Weighted complexity, 0..=100
    pub complexity_score: u8,

    pub factors: ComplexityFactors,

    pub validator_type: ValidatorType,
}

/// Why a positive verdict was overturned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideReason {
    InsufficientCertainty,
}

/// One validator's contribution to a merged result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IndividualResult {
    /// 1-based position of the validator in the merge input
    pub validator_index: usize,
    pub is_valid: bool,
    pub certainty_level: u8,
    pub validation_level: ValidationLevel,
    pub validation_timestamp: DateTime<Utc>,
}

/// Verdict produced by a validator, the merger or the certainty gate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,

    /// 1..=5; 0 only for the empty-merge sentinel
    pub certainty_level: u8,

    pub validation_level: ValidationLevel,

    #[serde(default = "Utc::now")]
    pub validation_timestamp: DateTime<Utc>,

    #[serde(default)]
    pub evidence: EvidenceMap,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub individual_results: Option<Vec<IndividualResult>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_reason: Option<OverrideReason>,
}

impl ValidationResult {
    /// A fresh result stamped with the current time.
    pub fn new(is_valid: bool, certainty_level: u8, validation_level: ValidationLevel) -> Self {
        Self {
            is_valid,
            certainty_level,
            validation_level,
            validation_timestamp: Utc::now(),
            evidence: EvidenceMap::new(),
            individual_results: None,
            override_reason: None,
        }
    }

    /// Attach evidence.
    pub fn with_evidence(mut self, evidence: EvidenceMap) -> Self {
        self.evidence = evidence;
        self
    }

    /// Whether this result may be attested.
    pub fn is_attestable(&self) -> bool {
        self.is_valid && self.certainty_level >= ATTESTATION_MIN_CERTAINTY
    }
}

/// Error record that stands in for a failed batch item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ItemError {
    /// Stable machine code (e.g. "not_found")
    pub code: String,
    pub message: String,
    /// HTTP-style status class
    pub status: u16,
}

/// One slot of a batch, as seen by the aggregator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemResult {
    pub index: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regulation_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_result: Option<ValidationResult>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ItemError>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestation: Option<AttestationCertificate>,
}

/// Batch statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AggregateSummary {
    pub total_count: usize,
    pub success_count: usize,
    pub failure_count: usize,
    /// Mean certainty over items that carry one, one decimal place
    pub average_certainty: f64,
    /// Rounded percentage of successful items
    pub success_rate: u32,
}

/// Lifecycle state of an attestation certificate. Issuance only ever
/// produces active certificates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateStatus {
    Active,
}

/// Signed assertion that a regulation version was validated with high certainty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttestationCertificate {
    pub certificate_id: String,
    pub regulation_id: String,
    pub regulation_version: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub issuer: String,
    pub signature: String,
    pub status: CertificateStatus,
}

/// Kinds of audit events emitted by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditEventType {
    #[serde(rename = "validation.requested")]
    ValidationRequested,
    #[serde(rename = "validation.completed")]
    ValidationCompleted,
    #[serde(rename = "batch.requested")]
    BatchRequested,
    #[serde(rename = "batch.completed")]
    BatchCompleted,
}

impl AuditEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationRequested => "validation.requested",
            Self::ValidationCompleted => "validation.completed",
            Self::BatchRequested => "batch.requested",
            Self::BatchCompleted => "batch.completed",
        }
    }
}

/// Audit record handed to an audit sink.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub event_type: AuditEventType,
    pub entity_type: String,
    pub entity_id: String,
    pub action: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    /// Create an event stamped with the current time.
    pub fn new(
        event_type: AuditEventType,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            event_type,
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            action: action.into(),
            metadata: serde_json::Value::Null,
            user_id: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Version drift reported by the version service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VersionStatus {
    pub has_changes: bool,
    #[serde(default)]
    pub changes: Vec<String>,
    pub authority_version: String,
}
