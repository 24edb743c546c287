//! Severity buckets for validator-reported issues.
//!
//! Fixed rules, checked in order:
//! - `contradiction`, `omission`, `factual_error` or impact `high` -> critical
//! - `inconsistency`, `ambiguity` or impact `medium` -> major
//! - anything else -> minor
//!
//! Type and impact are compared case-insensitively.

use serde::{Deserialize, Serialize};

use crate::evidence::ValidationIssue;

const CRITICAL_TYPES: &[&str] = &["contradiction", "omission", "factual_error"];
const MAJOR_TYPES: &[&str] = &["inconsistency", "ambiguity"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Minor,
    Major,
    Critical,
}

impl Severity {
    /// Severity of a single issue.
    pub fn of(issue: &ValidationIssue) -> Self {
        let issue_type = issue.issue_type.trim().to_lowercase();
        let impact = issue
            .impact
            .as_deref()
            .map(|i| i.trim().to_lowercase())
            .unwrap_or_default();

        if CRITICAL_TYPES.contains(&issue_type.as_str()) || impact == "high" {
            Self::Critical
        } else if MAJOR_TYPES.contains(&issue_type.as_str()) || impact == "medium" {
            Self::Major
        } else {
            Self::Minor
        }
    }
}

/// Issues split by severity, input order preserved within each bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorizedIssues {
    pub critical: Vec<ValidationIssue>,
    pub major: Vec<ValidationIssue>,
    pub minor: Vec<ValidationIssue>,
}

impl CategorizedIssues {
    pub fn critical_count(&self) -> usize {
        self.critical.len()
    }

    pub fn major_count(&self) -> usize {
        self.major.len()
    }

    pub fn minor_count(&self) -> usize {
        self.minor.len()
    }

    pub fn total(&self) -> usize {
        self.critical.len() + self.major.len() + self.minor.len()
    }
}

/// Bucket issues into critical, major and minor.
pub fn categorize_errors(issues: &[ValidationIssue]) -> CategorizedIssues {
    let mut categorized = CategorizedIssues::default();

    for issue in issues {
        let bucket = match Severity::of(issue) {
            Severity::Critical => &mut categorized.critical,
            Severity::Major => &mut categorized.major,
            Severity::Minor => &mut categorized.minor,
        };
        bucket.push(issue.clone());
    }

    categorized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_critical_types() {
        for t in ["contradiction", "omission", "factual_error", "Omission"] {
            assert_eq!(Severity::of(&ValidationIssue::new(t)), Severity::Critical, "{}", t);
        }
    }

    #[test]
    fn test_impact_overrides_type() {
        let issue = ValidationIssue::new("formatting").with_impact("HIGH");
        assert_eq!(Severity::of(&issue), Severity::Critical);

        let issue = ValidationIssue::new("formatting").with_impact("medium");
        assert_eq!(Severity::of(&issue), Severity::Major);
    }

    #[test]
    fn test_critical_type_wins_over_low_impact() {
        let issue = ValidationIssue::new("contradiction").with_impact("low");
        assert_eq!(Severity::of(&issue), Severity::Critical);
    }

    #[test]
    fn test_categorize_errors_buckets_and_counts() {
        let issues = vec![
            ValidationIssue::new("omission"),
            ValidationIssue::new("ambiguity"),
            ValidationIssue::new("typo"),
            ValidationIssue::new("inconsistency"),
            ValidationIssue::new("typo").with_impact("low"),
        ];

        let categorized = categorize_errors(&issues);

        assert_eq!(categorized.critical_count(), 1);
        assert_eq!(categorized.major_count(), 2);
        assert_eq!(categorized.minor_count(), 2);
        assert_eq!(categorized.total(), 5);
        assert_eq!(categorized.major[0].issue_type, "ambiguity");
        assert_eq!(categorized.major[1].issue_type, "inconsistency");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(categorize_errors(&[]), CategorizedIssues::default());
    }
}
