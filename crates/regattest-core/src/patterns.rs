//! Shared detection patterns for regulation text.
//!
//! The classifier uses these to spot mandatory language, numeric
//! requirements and compliance vocabulary in a regulation's title and
//! descriptive metadata.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Mandatory-language markers ("shall", "pursuant to", ...)
    pub static ref MANDATORY_LANGUAGE_PATTERN: Regex = Regex::new(
        r"(?i)\b(shall|must|is required to|are required to|pursuant to|in accordance with|prohibited|mandatory)\b"
    ).unwrap();

    /// Numeric requirements: percentages, day/month/year counts, currency amounts
    pub static ref NUMERIC_REQUIREMENT_PATTERN: Regex = Regex::new(
        r"(?i)(\d+(\.\d+)?\s*(%|percent\b)|\b\d+\s*(calendar\s+|business\s+)?(days?|months?|years?)\b|[$€£]\s?\d|\b\d+\s*(usd|eur|gbp|dollars)\b)"
    ).unwrap();

    /// Technical and compliance vocabulary
    pub static ref TECHNICAL_VOCABULARY_PATTERN: Regex = Regex::new(
        r"(?i)\b(compliance|audit(ing)?|disclosure|encryption|authentication|accreditation|certification|fiduciary|liability|data protection|reporting|risk management|safeguards?)\b"
    ).unwrap();

    /// Sentence punctuation used by the local basic validator
    pub static ref PUNCTUATION_PATTERN: Regex = Regex::new(r"[.!?;:,]").unwrap();
}

/// Check if text contains mandatory-language markers.
pub fn contains_mandatory_language(text: &str) -> bool {
    MANDATORY_LANGUAGE_PATTERN.is_match(text)
}

/// Check if text contains numeric requirements.
pub fn contains_numeric_requirement(text: &str) -> bool {
    NUMERIC_REQUIREMENT_PATTERN.is_match(text)
}

/// Check if text contains technical or compliance vocabulary.
pub fn contains_technical_vocabulary(text: &str) -> bool {
    TECHNICAL_VOCABULARY_PATTERN.is_match(text)
}

/// Check if text contains sentence punctuation.
pub fn contains_punctuation(text: &str) -> bool {
    PUNCTUATION_PATTERN.is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mandatory_language_detection() {
        assert!(contains_mandatory_language("Lenders shall disclose fees"));
        assert!(contains_mandatory_language("Pursuant to Section 4"));
        assert!(contains_mandatory_language("Filing is MANDATORY for all"));
        assert!(!contains_mandatory_language("Guidance on shallow wells"));
        assert!(!contains_mandatory_language("Campus parking guide"));
    }

    #[test]
    fn test_numeric_requirement_detection() {
        assert!(contains_numeric_requirement("Reserve ratio of 10%"));
        assert!(contains_numeric_requirement("Notify within 30 days"));
        assert!(contains_numeric_requirement("Retain records for 7 years"));
        assert!(contains_numeric_requirement("Fines up to $5,000"));
        assert!(contains_numeric_requirement("Reply within 5 business days"));
        assert!(!contains_numeric_requirement("Title IV Eligibility"));
    }

    #[test]
    fn test_technical_vocabulary_detection() {
        assert!(contains_technical_vocabulary("Annual Compliance Report"));
        assert!(contains_technical_vocabulary("Data Protection Standard"));
        assert!(contains_technical_vocabulary("Encryption at rest"));
        assert!(!contains_technical_vocabulary("Library opening hours"));
    }

    #[test]
    fn test_punctuation_detection() {
        assert!(contains_punctuation("Section 1. Scope"));
        assert!(!contains_punctuation("no punctuation here"));
    }
}
