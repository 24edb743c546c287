//! # regattest-core
//!
//! Deterministic building blocks of the regulation validation engine.
//!
//! This crate answers, without any I/O:
//! - How complex is this regulation, and which validation level does it need?
//! - What does the local validator say when no remote validator can answer?
//! - How are several validators' verdicts combined, gated and summarized?
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same input always produces same output
//! 2. **Never lowers a level**: Classification only escalates the requested level
//! 3. **Least confident wins**: Merged certainty is the minimum, never an average
//! 4. **Capped fallback**: The local validator never reports certainty above 2
//!
//! ## Example
//!
//! ```rust,ignore
//! use regattest_core::{Aggregator, Classifier, LocalBasicValidator, ValidationRequest};
//!
//! let request = ValidationRequest::from_json_str(json)?;
//! let classification = Classifier::new().classify(&snapshot, request.requested_level);
//! let result = LocalBasicValidator::new().validate(&request.content);
//! let gated = Aggregator::new().process_validation_response(result, &request.options);
//! println!("{}", generate_human_readable_summary(&gated));
//! ```

pub mod aggregator;
pub mod basic;
pub mod classifier;
pub mod evidence;
pub mod patterns;
pub mod request;
pub mod severity;
pub mod summary;
pub mod types;
pub mod version;

// Re-export main types at crate root
pub use aggregator::{AggregateItem, Aggregator};
pub use basic::{FallbackReason, LocalBasicValidator, FALLBACK_CERTAINTY_CAP};
pub use classifier::{level_for_score, Classifier, SizeBucket};
pub use evidence::{issues_from_evidence, EvidenceBuilder, EvidenceMap, ValidationIssue};
pub use request::{validate_request_schema, RequestError};
pub use severity::{categorize_errors, CategorizedIssues, Severity};
pub use summary::generate_human_readable_summary;
pub use types::{
    AggregateSummary, AttestationCertificate, AuditEvent, AuditEventType, BatchItemResult,
    CertificateStatus, Classification, ComplexityFactors, IndividualResult, InvalidLevel,
    ItemError, OverrideReason, RegulationContent, RegulationSnapshot, ValidationLevel,
    ValidationOptions, ValidationRequest, ValidationResult, ValidatorType, VersionStatus,
    ATTESTATION_MIN_CERTAINTY, CERTIFICATE_VALIDITY_DAYS, MAX_CERTAINTY, MIN_CERTAINTY,
};
pub use version::{RegulationVersion, VersionDrift, VersionParseError};

/// Merge several validators' results for one regulation.
///
/// Shorthand for [`Aggregator::merge_validation_results`].
pub fn merge_validation_results(results: &[ValidationResult]) -> ValidationResult {
    Aggregator::new().merge_validation_results(results)
}

/// Summarize a batch. Shorthand for [`Aggregator::aggregate_results`].
pub fn aggregate_results<T: AggregateItem>(items: &[T]) -> AggregateSummary {
    Aggregator::new().aggregate_results(items)
}

/// Apply the certainty gate. Shorthand for [`Aggregator::process_validation_response`].
pub fn process_validation_response(
    result: ValidationResult,
    options: &ValidationOptions,
) -> ValidationResult {
    Aggregator::new().process_validation_response(result, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot() -> RegulationSnapshot {
        RegulationSnapshot {
            id: "R1".to_string(),
            title: "Campus parking".to_string(),
            category: "facilities".to_string(),
            jurisdiction: "institutional".to_string(),
            current_version: "1.0.0".to_string(),
            metadata: Default::default(),
        }
    }

    #[test]
    fn test_local_pipeline_empty_text_is_invalid() {
        let request = ValidationRequest::from_json(&json!({
            "regulationId": "R1",
            "regulationVersion": "1.0.0",
            "content": { "text": "" },
            "requestedLevel": 1
        }))
        .unwrap();

        let classification = Classifier::new().classify(&snapshot(), request.requested_level);
        assert_eq!(classification.validation_level, ValidationLevel::Text);

        let result = LocalBasicValidator::new().validate(&request.content);
        let merged = merge_validation_results(std::slice::from_ref(&result));
        let gated = process_validation_response(merged, &request.options);

        assert!(!gated.is_valid);
        assert!(!gated.is_attestable());
    }

    #[test]
    fn test_fallback_never_attestable_even_when_demanded() {
        let options = ValidationOptions {
            require_certainty: 4,
            ..Default::default()
        };
        let result = LocalBasicValidator::new().validate(&RegulationContent::text("Text."));
        let gated = process_validation_response(result, &options);

        assert!(!gated.is_valid);
        assert_eq!(gated.override_reason, Some(OverrideReason::InsufficientCertainty));
        assert!(generate_human_readable_summary(&gated).contains("overridden"));
    }
}
