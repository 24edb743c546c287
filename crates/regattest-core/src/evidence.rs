//! Evidence attached to validation results.
//!
//! Validators report evidence as a flat, ordered key/value map so that
//! merged results stay deterministic. Reported issues travel under the
//! `errors` key.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key/value evidence map. Ordered so output is reproducible.
pub type EvidenceMap = BTreeMap<String, Value>;

/// Evidence key under which validators list the issues they found.
pub const ERRORS_KEY: &str = "errors";

/// A discrepancy reported by a validator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    /// Issue kind (e.g. "omission", "ambiguity")
    #[serde(rename = "type")]
    pub issue_type: String,

    /// Reported impact ("high", "medium", "low")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Where in the text the issue sits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl ValidationIssue {
    pub fn new(issue_type: impl Into<String>) -> Self {
        Self {
            issue_type: issue_type.into(),
            impact: None,
            description: None,
            location: None,
        }
    }

    pub fn with_impact(mut self, impact: impl Into<String>) -> Self {
        self.impact = Some(impact.into());
        self
    }
}

/// Extract the issues listed under `errors`.
///
/// Entries that do not decode as an issue are skipped.
pub fn issues_from_evidence(evidence: &EvidenceMap) -> Vec<ValidationIssue> {
    let Some(Value::Array(entries)) = evidence.get(ERRORS_KEY) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match serde_json::from_value(entry.clone()) {
            Ok(issue) => Some(issue),
            Err(e) => {
                tracing::debug!(error = %e, "Skipping malformed issue in evidence");
                None
            }
        })
        .collect()
}

/// Builder for evidence maps with a fluent API.
#[derive(Debug, Default)]
pub struct EvidenceBuilder {
    entries: EvidenceMap,
}

impl EvidenceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a boolean flag.
    pub fn flag(mut self, key: impl Into<String>, value: bool) -> Self {
        self.entries.insert(key.into(), Value::Bool(value));
        self
    }

    /// Record a numeric metric.
    pub fn metric(mut self, key: impl Into<String>, value: usize) -> Self {
        self.entries.insert(key.into(), Value::from(value));
        self
    }

    /// Record any JSON value.
    pub fn value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Record a list of issues under `errors`.
    pub fn issues(mut self, issues: &[ValidationIssue]) -> Self {
        let list = issues
            .iter()
            .filter_map(|issue| serde_json::to_value(issue).ok())
            .collect();
        self.entries.insert(ERRORS_KEY.to_string(), Value::Array(list));
        self
    }

    pub fn build(self) -> EvidenceMap {
        self.entries
    }
}
