//! Classifier: scores a regulation's complexity and picks a minimum level.
//!
//! Four independent factor scores (0..=100) are combined with fixed weights:
//!
//! | Factor | Weight | Source |
//! |--------|--------|--------|
//! | text complexity | 0.3 | title and metadata patterns, size bucket, category baseline |
//! | content size | 0.2 | title length bucket |
//! | change frequency | 0.3 | static category table |
//! | structural complexity | 0.2 | jurisdiction table |
//!
//! The change-frequency and jurisdiction tables are static lookups, not
//! learned models. Classification can only raise the requested level.

use crate::patterns::{
    contains_mandatory_language, contains_numeric_requirement, contains_technical_vocabulary,
};
use crate::types::{Classification, ComplexityFactors, RegulationSnapshot, ValidationLevel};

// Factor weights in tenths (0.3, 0.2, 0.3, 0.2).
const TEXT_COMPLEXITY_WEIGHT: u32 = 3;
const CONTENT_SIZE_WEIGHT: u32 = 2;
const CHANGE_FREQUENCY_WEIGHT: u32 = 3;
const STRUCTURAL_COMPLEXITY_WEIGHT: u32 = 2;

const LARGE_CONTENT_CHARS: usize = 100;
const MEDIUM_CONTENT_CHARS: usize = 50;

/// Categories whose regulations change often.
const HIGH_CHANGE_CATEGORIES: &[&str] = &["technology", "financial", "healthcare", "security"];

/// Categories that change occasionally.
const MODERATE_CHANGE_CATEGORIES: &[&str] = &["academic", "policy", "admissions"];

/// Title-length bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeBucket {
    Large,
    Medium,
    Small,
}

impl SizeBucket {
    pub fn of(text: &str) -> Self {
        let chars = text.chars().count();
        if chars >= LARGE_CONTENT_CHARS {
            Self::Large
        } else if chars >= MEDIUM_CONTENT_CHARS {
            Self::Medium
        } else {
            Self::Small
        }
    }

    /// Standalone content-size factor.
    fn score(self) -> u8 {
        match self {
            Self::Large => 100,
            Self::Medium => 50,
            Self::Small => 25,
        }
    }

    /// Contribution to the text-complexity factor.
    fn text_contribution(self) -> u32 {
        match self {
            Self::Large => 30,
            Self::Medium => 15,
            Self::Small => 0,
        }
    }
}

/// Level selected by a complexity score alone.
pub fn level_for_score(score: u8) -> ValidationLevel {
    if score < 30 {
        ValidationLevel::Text
    } else if score < 70 {
        ValidationLevel::Pattern
    } else {
        ValidationLevel::Context
    }
}

/// Deterministic regulation classifier. Pure; performs no I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct Classifier;

impl Classifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify a regulation for a requested level.
    pub fn classify(
        &self,
        snapshot: &RegulationSnapshot,
        requested_level: ValidationLevel,
    ) -> Classification {
        let factors = ComplexityFactors {
            text_complexity: self.text_complexity(snapshot),
            content_size: SizeBucket::of(&snapshot.title).score(),
            change_frequency: self.change_frequency(&snapshot.category),
            structural_complexity: self.structural_complexity(&snapshot.jurisdiction),
        };

        let complexity_score = weighted_score(&factors);
        let validation_level = requested_level.max(level_for_score(complexity_score));

        tracing::debug!(
            regulation_id = %snapshot.id,
            score = complexity_score,
            requested = %requested_level,
            level = %validation_level,
            "Classified regulation"
        );

        Classification {
            regulation_id: snapshot.id.clone(),
            validation_level,
            complexity_score,
            factors,
            validator_type: validation_level.validator_type(),
        }
    }

    /// Pattern checks over the title and metadata text, plus the title's
    /// size bucket and the category baseline.
    fn text_complexity(&self, snapshot: &RegulationSnapshot) -> u8 {
        let text = snapshot.descriptive_text();
        let mut score: u32 = 0;

        if contains_mandatory_language(&text) {
            score += 25;
        }
        if contains_numeric_requirement(&text) {
            score += 20;
        }
        if contains_technical_vocabulary(&text) {
            score += 15;
        }

        score += SizeBucket::of(&snapshot.title).text_contribution();
        score += category_baseline(&snapshot.category);

        score.min(100) as u8
    }

    /// Static category volatility table.
    fn change_frequency(&self, category: &str) -> u8 {
        let category = normalize(category);
        if HIGH_CHANGE_CATEGORIES.contains(&category.as_str()) {
            75
        } else if MODERATE_CHANGE_CATEGORIES.contains(&category.as_str()) {
            50
        } else {
            25
        }
    }

    /// Static jurisdiction table.
    fn structural_complexity(&self, jurisdiction: &str) -> u8 {
        let jurisdiction = normalize(jurisdiction);
        match jurisdiction.as_str() {
            "federal" => 80,
            "state" => 60,
            j if j.contains("accredit") => 70,
            _ => 40,
        }
    }
}

fn category_baseline(category: &str) -> u32 {
    match normalize(category).as_str() {
        "financial" => 20,
        "policy" => 10,
        _ => 0,
    }
}

fn weighted_score(factors: &ComplexityFactors) -> u8 {
    // Weights in tenths keep the sum exact; round half up on the way back.
    let tenths = u32::from(factors.text_complexity) * TEXT_COMPLEXITY_WEIGHT
        + u32::from(factors.content_size) * CONTENT_SIZE_WEIGHT
        + u32::from(factors.change_frequency) * CHANGE_FREQUENCY_WEIGHT
        + u32::from(factors.structural_complexity) * STRUCTURAL_COMPLEXITY_WEIGHT;

    ((tenths + 5) / 10).min(100) as u8
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn snapshot(title: &str, category: &str, jurisdiction: &str) -> RegulationSnapshot {
        RegulationSnapshot {
            id: "REG-1".to_string(),
            title: title.to_string(),
            category: category.to_string(),
            jurisdiction: jurisdiction.to_string(),
            current_version: "1.0.0".to_string(),
            metadata: Default::default(),
        }
    }

    #[test]
    fn test_simple_regulation_stays_at_level_one() {
        let snap = snapshot("Campus parking", "facilities", "institutional");
        let c = Classifier::new().classify(&snap, ValidationLevel::Text);

        // text 0, size 25, change 25, structure 40 -> 0 + 5 + 7.5 + 8 = 20.5 -> 21
        assert_eq!(c.factors.text_complexity, 0);
        assert_eq!(c.factors.content_size, 25);
        assert_eq!(c.factors.change_frequency, 25);
        assert_eq!(c.factors.structural_complexity, 40);
        assert_eq!(c.complexity_score, 21);
        assert_eq!(c.validation_level, ValidationLevel::Text);
        assert_eq!(c.validator_type, crate::types::ValidatorType::Text);
    }

    #[test]
    fn test_complex_federal_financial_regulation_escalates_to_context() {
        let title = "Lenders shall disclose all fees exceeding 5% within 30 days pursuant to \
                     federal compliance and reporting requirements for consumer credit";
        let snap = snapshot(title, "Financial", "Federal");
        let c = Classifier::new().classify(&snap, ValidationLevel::Text);

        // text 25+20+15+30+20 = 110 -> 100; size 100; change 75; structure 80
        assert_eq!(c.factors.text_complexity, 100);
        assert_eq!(c.factors.content_size, 100);
        assert_eq!(c.factors.change_frequency, 75);
        assert_eq!(c.factors.structural_complexity, 80);
        assert_eq!(c.complexity_score, 89);
        assert_eq!(c.validation_level, ValidationLevel::Context);
    }

    #[test]
    fn test_moderate_regulation_selects_pattern() {
        let snap = snapshot("Admissions Compliance Policy", "admissions", "state");
        let c = Classifier::new().classify(&snap, ValidationLevel::Text);

        // text 15, size 25, change 50, structure 60 -> 4.5 + 5 + 15 + 12 = 36.5 -> 37
        assert_eq!(c.complexity_score, 37);
        assert_eq!(c.validation_level, ValidationLevel::Pattern);
    }

    #[test]
    fn test_metadata_text_counts_toward_text_complexity() {
        let mut snap = snapshot("Campus parking", "facilities", "institutional");
        snap.metadata.insert(
            "summary".to_string(),
            serde_json::json!("Vehicles must display permits within 10 days"),
        );
        snap.metadata.insert("pages".to_string(), serde_json::json!(3));

        let c = Classifier::new().classify(&snap, ValidationLevel::Text);

        // text 25+20 = 45; size still from the title -> 13.5 + 5 + 7.5 + 8 = 34
        assert_eq!(c.factors.text_complexity, 45);
        assert_eq!(c.factors.content_size, 25);
        assert_eq!(c.complexity_score, 34);
        assert_eq!(c.validation_level, ValidationLevel::Pattern);
    }

    #[test]
    fn test_requested_level_is_never_lowered() {
        let snap = snapshot("Campus parking", "facilities", "institutional");
        let c = Classifier::new().classify(&snap, ValidationLevel::Context);
        assert_eq!(c.validation_level, ValidationLevel::Context);
        assert_eq!(c.validator_type, crate::types::ValidatorType::Context);
    }

    #[test]
    fn test_accreditation_jurisdiction() {
        let c = Classifier::new().classify(
            &snapshot("Standards", "academic", "Regional Accreditation Body"),
            ValidationLevel::Text,
        );
        assert_eq!(c.factors.structural_complexity, 70);
        assert_eq!(c.factors.change_frequency, 50);
    }

    #[test]
    fn test_change_frequency_table_is_static() {
        // Intentionally a fixed lookup: volatility comes only from the category name.
        let classifier = Classifier::new();
        assert_eq!(classifier.change_frequency("technology"), 75);
        assert_eq!(classifier.change_frequency(" Security "), 75);
        assert_eq!(classifier.change_frequency("policy"), 50);
        assert_eq!(classifier.change_frequency("athletics"), 25);
    }

    #[test]
    fn test_score_bands() {
        assert_eq!(level_for_score(0), ValidationLevel::Text);
        assert_eq!(level_for_score(29), ValidationLevel::Text);
        assert_eq!(level_for_score(30), ValidationLevel::Pattern);
        assert_eq!(level_for_score(69), ValidationLevel::Pattern);
        assert_eq!(level_for_score(70), ValidationLevel::Context);
        assert_eq!(level_for_score(100), ValidationLevel::Context);
    }

    fn any_level() -> impl Strategy<Value = ValidationLevel> {
        prop_oneof![
            Just(ValidationLevel::Text),
            Just(ValidationLevel::Pattern),
            Just(ValidationLevel::Context),
        ]
    }

    proptest! {
        #[test]
        fn prop_level_monotonic_in_score(a in 0u8..=100, b in 0u8..=100) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(level_for_score(lo) <= level_for_score(hi));
        }

        #[test]
        fn prop_never_below_requested(
            title in ".{0,160}",
            category in "(financial|policy|technology|academic|other)",
            jurisdiction in "(federal|state|accreditation|local)",
            requested in any_level(),
        ) {
            let c = Classifier::new()
                .classify(&snapshot(&title, &category, &jurisdiction), requested);
            prop_assert!(c.validation_level >= requested);
            prop_assert!(c.complexity_score <= 100);
            prop_assert_eq!(
                c.validation_level,
                requested.max(level_for_score(c.complexity_score))
            );
        }

        #[test]
        fn prop_classification_is_idempotent(
            title in ".{0,160}",
            category in "[a-z]{0,12}",
            jurisdiction in "[a-z]{0,12}",
            requested in any_level(),
        ) {
            let snap = snapshot(&title, &category, &jurisdiction);
            let classifier = Classifier::new();
            let first = classifier.classify(&snap, requested);
            let second = classifier.classify(&snap, requested);
            prop_assert_eq!(first, second);
        }
    }
}
