//! Structural Parameter Extraction
//!
//! Pure regex-driven feature extraction over clause text: notice periods,
//! monetary amounts, mutuality, cause requirements, caps, cure periods,
//! and named substring markers. Same input always yields the same record.

use regex::Regex;
use std::sync::LazyLock;

use crate::types::ExtractedParameters;

static DAYS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*(?:business\s+)?days?").expect("static regex"));
static MONTHS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*months?").expect("static regex"));
static YEARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*years?").expect("static regex"));
static AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\s*[\d,]+(?:\.\d{2})?").expect("static regex"));
static WRITTEN_NOTICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)written\s+notice").expect("static regex"));
static PARTY_SYMMETRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:either|both)\s+part(?:y|ies)").expect("static regex"));
static FOR_CAUSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)for\s+cause").expect("static regex"));

const CAP_INDICATORS: &[&str] = &["limited to", "shall not exceed", "maximum", "cap"];
const CURE_INDICATORS: &[&str] = &["cure", "remedy", "correct the breach"];

/// Regex structural feature extractor
pub struct ParameterExtractor;

impl ParameterExtractor {
    pub fn extract(text: &str) -> ExtractedParameters {
        let lower = text.to_lowercase();
        let mut params = ExtractedParameters::default();

        params.days_mentioned = first_int(&DAYS, text);
        params.months_mentioned = first_int(&MONTHS, text);
        params.years_mentioned = first_int(&YEARS, text);

        params.amounts_mentioned = AMOUNT
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect();

        params.has_written_notice = WRITTEN_NOTICE.is_match(text);
        params.is_mutual = PARTY_SYMMETRY.is_match(text);
        params.requires_cause = FOR_CAUSE.is_match(text);
        params.has_cap = CAP_INDICATORS.iter().any(|i| lower.contains(i));
        params.has_cure_period = CURE_INDICATORS.iter().any(|i| lower.contains(i));

        params.raw_text_markers = [
            (
                "contains_unilateral",
                lower.contains("company may") || lower.contains("vendor may"),
            ),
            ("contains_either_party", lower.contains("either party")),
            ("contains_without_cause", lower.contains("without cause")),
            ("contains_immediately", lower.contains("immediately")),
            (
                "contains_unlimited",
                lower.contains("unlimited") || lower.contains("all claims"),
            ),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect();

        params
    }
}

fn first_int(pattern: &Regex, text: &str) -> Option<u32> {
    pattern
        .captures(text)?
        .get(1)?
        .as_str()
        .parse::<u32>()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temporal_captures() {
        let params =
            ParameterExtractor::extract("terminate upon 30 business days notice within 6 months");
        assert_eq!(params.days_mentioned, Some(30));
        assert_eq!(params.months_mentioned, Some(6));
        assert_eq!(params.years_mentioned, None);
    }

    #[test]
    fn test_amounts_keep_literal_form() {
        let params = ParameterExtractor::extract("fees of $1,500.00 plus $200 per day");
        assert_eq!(params.amounts_mentioned, vec!["$1,500.00", "$200"]);
    }

    #[test]
    fn test_boolean_flags() {
        let params = ParameterExtractor::extract(
            "Either party may terminate for cause upon written notice; liability is limited to \
             fees paid, with 30 days to cure any breach",
        );
        assert!(params.is_mutual);
        assert!(params.requires_cause);
        assert!(params.has_written_notice);
        assert!(params.has_cap);
        assert!(params.has_cure_period);
    }

    #[test]
    fn test_unilateral_termination_profile() {
        let params = ParameterExtractor::extract(
            "Company may terminate this Agreement at any time without cause or notice.",
        );
        assert!(!params.is_mutual);
        assert!(!params.has_written_notice);
        assert_eq!(params.raw_text_markers.get("contains_unilateral"), Some(&true));
        assert_eq!(
            params.raw_text_markers.get("contains_without_cause"),
            Some(&true)
        );
        assert_eq!(
            params.raw_text_markers.get("contains_either_party"),
            Some(&false)
        );
    }

    #[test]
    fn test_unlimited_marker() {
        let params = ParameterExtractor::extract(
            "Contractor shall be liable for all damages without limitation and all claims.",
        );
        assert_eq!(params.raw_text_markers.get("contains_unlimited"), Some(&true));
    }

    #[test]
    fn test_extractor_is_pure() {
        let text = "Either party may terminate upon 60 days written notice.";
        assert_eq!(
            ParameterExtractor::extract(text),
            ParameterExtractor::extract(text)
        );
    }

    #[test]
    fn test_empty_text_defaults() {
        let params = ParameterExtractor::extract("");
        assert_eq!(params.days_mentioned, None);
        assert!(params.amounts_mentioned.is_empty());
        assert!(!params.has_cap);
    }
}
