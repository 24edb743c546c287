//! Plain-language rendering of a validation result.
//!
//! Output depends only on the result's validity, certainty, level, override
//! and listed issues. The timestamp is never rendered, so identical results
//! always produce identical text.

use crate::evidence::issues_from_evidence;
use crate::severity::categorize_errors;
use crate::types::{OverrideReason, ValidationLevel, ValidationResult};

fn certainty_phrase(certainty: u8) -> &'static str {
    match certainty {
        0 => "undetermined confidence",
        1 => "very low confidence",
        2 => "low confidence",
        3 => "moderate confidence",
        4 => "high confidence",
        _ => "very high confidence",
    }
}

fn level_phrase(level: ValidationLevel) -> &'static str {
    match level {
        ValidationLevel::Text => "static text comparison",
        ValidationLevel::Pattern => "pattern-based analysis",
        ValidationLevel::Context => "context-aware analysis",
    }
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{} {}", count, noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

/// Render a deterministic summary of a (gated) result.
pub fn generate_human_readable_summary(result: &ValidationResult) -> String {
    let verdict = if result.is_valid {
        "Regulation content is valid"
    } else {
        "Regulation content is not valid"
    };

    let mut summary = format!(
        "{} ({}, certainty {}/5) based on {}.",
        verdict,
        certainty_phrase(result.certainty_level),
        result.certainty_level,
        level_phrase(result.validation_level),
    );

    if result.override_reason == Some(OverrideReason::InsufficientCertainty) {
        summary.push_str(
            " The validator's positive verdict was overridden because its certainty is below the required level.",
        );
    }

    let categorized = categorize_errors(&issues_from_evidence(&result.evidence));
    if categorized.total() == 0 {
        summary.push_str(" No issues were reported.");
    } else {
        summary.push_str(&format!(
            " Found {}: {}, {} and {}.",
            plural(categorized.total(), "issue"),
            plural(categorized.critical_count(), "critical issue"),
            plural(categorized.major_count(), "major issue"),
            plural(categorized.minor_count(), "minor issue"),
        ));
    }

    summary
}
