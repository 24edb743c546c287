//! Aggregator: merges validator outputs and summarizes batches.
//!
//! The merge applies strict, non-configurable rules:
//! 1. Validity is conjunctive: any invalid result makes the merge invalid
//! 2. Certainty is the MINIMUM across validators, never an average
//! 3. Level is the MAXIMUM across validators
//! 4. Timestamp is the latest input timestamp
//!
//! A single low-confidence validator therefore bounds the whole verdict.

use chrono::Utc;
use serde_json::Value;

use crate::evidence::EvidenceMap;

/// Evidence keys the merge writes itself.
const VALIDATOR_COUNT_KEY: &str = "validatorCount";
const VALIDATORS_AGREED_KEY: &str = "validatorsAgreed";
const SUMMARY_KEYS: [&str; 2] = [VALIDATOR_COUNT_KEY, VALIDATORS_AGREED_KEY];
use crate::types::{
    AggregateSummary, BatchItemResult, IndividualResult, OverrideReason, ValidationLevel,
    ValidationOptions, ValidationResult,
};

/// A batch slot the aggregator can count.
pub trait AggregateItem {
    /// The item's (gated) result, if it produced one.
    fn validation_result(&self) -> Option<&ValidationResult>;

    /// Whether the item carries an error record.
    fn has_error(&self) -> bool;
}

impl AggregateItem for BatchItemResult {
    fn validation_result(&self) -> Option<&ValidationResult> {
        self.validation_result.as_ref()
    }

    fn has_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Merges per-regulation results and summarizes batches.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregator;

impl Aggregator {
    pub fn new() -> Self {
        Self
    }

    /// Merge several validators' results for one regulation.
    ///
    /// Zero inputs yield an invalid, certainty-0 sentinel rather than an error.
    pub fn merge_validation_results(&self, results: &[ValidationResult]) -> ValidationResult {
        let Some(first) = results.first() else {
            let mut sentinel = ValidationResult::new(false, 0, ValidationLevel::Text);
            sentinel
                .evidence
                .insert(VALIDATOR_COUNT_KEY.to_string(), Value::from(0));
            sentinel
                .evidence
                .insert(VALIDATORS_AGREED_KEY.to_string(), Value::Bool(false));
            sentinel.individual_results = Some(Vec::new());
            return sentinel;
        };

        let is_valid = results.iter().all(|r| r.is_valid);
        let certainty_level = results
            .iter()
            .map(|r| r.certainty_level)
            .min()
            .unwrap_or(0);
        let validation_level = results
            .iter()
            .map(|r| r.validation_level)
            .max()
            .unwrap_or(first.validation_level);
        let validation_timestamp = results
            .iter()
            .map(|r| r.validation_timestamp)
            .max()
            .unwrap_or_else(Utc::now);
        let validators_agreed = results.iter().all(|r| r.is_valid == first.is_valid);

        let mut evidence = self.merge_evidence(results);
        evidence.insert(VALIDATOR_COUNT_KEY.to_string(), Value::from(results.len()));
        evidence.insert(
            VALIDATORS_AGREED_KEY.to_string(),
            Value::Bool(validators_agreed),
        );

        let individual_results = results
            .iter()
            .enumerate()
            .map(|(i, r)| IndividualResult {
                validator_index: i + 1,
                is_valid: r.is_valid,
                certainty_level: r.certainty_level,
                validation_level: r.validation_level,
                validation_timestamp: r.validation_timestamp,
            })
            .collect();

        ValidationResult {
            is_valid,
            certainty_level,
            validation_level,
            validation_timestamp,
            evidence,
            individual_results: Some(individual_results),
            override_reason: None,
        }
    }

    /// Key-wise evidence merge. A colliding key is stored as `<key>_<n>`,
    /// starting at the validator's 1-based index and counting up to the
    /// first free suffix. No entry is ever overwritten, and the summary keys
    /// stay reserved for the merge itself.
    fn merge_evidence(&self, results: &[ValidationResult]) -> EvidenceMap {
        let mut merged = EvidenceMap::new();

        for (i, result) in results.iter().enumerate() {
            for (key, value) in &result.evidence {
                let target = if is_taken(&merged, key) {
                    free_suffixed_key(&merged, key, i + 1)
                } else {
                    key.clone()
                };
                merged.insert(target, value.clone());
            }
        }

        merged
    }

    /// Summarize a batch.
    ///
    /// An item succeeds when it has no error and a valid result. Average
    /// certainty covers only items that carry a result.
    pub fn aggregate_results<T: AggregateItem>(&self, items: &[T]) -> AggregateSummary {
        if items.is_empty() {
            return AggregateSummary::default();
        }

        let total_count = items.len();
        let success_count = items
            .iter()
            .filter(|item| {
                !item.has_error() && item.validation_result().is_some_and(|r| r.is_valid)
            })
            .count();

        let certainties: Vec<u8> = items
            .iter()
            .filter_map(|item| item.validation_result().map(|r| r.certainty_level))
            .collect();

        let average_certainty = if certainties.is_empty() {
            0.0
        } else {
            let sum: u32 = certainties.iter().map(|&c| u32::from(c)).sum();
            round_to_tenth(f64::from(sum) / certainties.len() as f64)
        };

        let success_rate = ((success_count as f64 / total_count as f64) * 100.0).round() as u32;

        AggregateSummary {
            total_count,
            success_count,
            failure_count: total_count - success_count,
            average_certainty,
            success_rate,
        }
    }

    /// Certainty gate: a positive verdict below the required certainty is
    /// downgraded and stamped with the override reason.
    pub fn process_validation_response(
        &self,
        mut result: ValidationResult,
        options: &ValidationOptions,
    ) -> ValidationResult {
        if result.is_valid && result.certainty_level < options.require_certainty {
            tracing::debug!(
                certainty = result.certainty_level,
                required = options.require_certainty,
                "Downgrading result below required certainty"
            );
            result.is_valid = false;
            result.override_reason = Some(OverrideReason::InsufficientCertainty);
        }
        result
    }
}

fn is_taken(merged: &EvidenceMap, key: &str) -> bool {
    merged.contains_key(key) || SUMMARY_KEYS.contains(&key)
}

fn free_suffixed_key(merged: &EvidenceMap, key: &str, start: usize) -> String {
    let mut suffix = start;
    loop {
        let candidate = format!("{}_{}", key, suffix);
        if !is_taken(merged, &candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
