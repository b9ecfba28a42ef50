//! Metadata Enrichment
//!
//! Header-region regex scans for parties and effective date, a
//! document-wide scan for monetary amounts, and contract-type keyword
//! voting over the opening text.

use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info};

use crate::constants::document as doc_constants;
use crate::text::take_chars;
use crate::types::DocumentMetadata;

static PARTY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?m)(?:between|by and between)\s+([A-Z][^,\n]+?)\s+(?:and|&)\s+([A-Z][^,\n]+?)(?:\s*(?:,|\(|dated))",
        r"(?m)entered into by\s+([A-Z][^,\n]+?)\s+and\s+([A-Z][^,\n]+?)(?:\s*(?:,|\())",
        r"(?m)(?:^|\n)([A-Z][A-Za-z\s&]+(?:Inc|LLC|Corp|Ltd|Corporation))[^\n]{0,50}(?:\n|$)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static regex"))
    .collect()
});

static DATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)effective\s+(?:date|as of)[:\s]+([^\n]+)",
        r"(?i)dated\s+(?:as of\s+)?([A-Z][a-z]+\s+\d{1,2},?\s+\d{4})",
        r"(?i)(?:this|entered into on)\s+([A-Z][a-z]+\s+\d{1,2},?\s+\d{4})",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static regex"))
    .collect()
});

static AMOUNT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\$\s*[\d,]+(?:\.\d{2})?(?:\s*(?:million|billion|thousand|USD|dollars))?")
        .expect("static regex")
});

static DATE_CLEANUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s,]").expect("static regex"));

/// Metadata enrichment over the cleaned full text
pub struct MetadataExtractor;

impl MetadataExtractor {
    /// Enrich `base` with parties, effective date, amounts, and contract
    /// type
    pub fn extract(full_text: &str, mut base: DocumentMetadata) -> DocumentMetadata {
        debug!("Extracting metadata");

        if let Some(parties) = Self::extract_parties(full_text) {
            base.parties = Some(parties);
        }

        if let Some(date) = Self::extract_effective_date(full_text) {
            base.effective_date = Some(date);
        }

        let amounts = Self::extract_amounts(full_text);
        if !amounts.is_empty() {
            base.mentioned_amounts =
                Some(amounts.into_iter().take(doc_constants::MAX_AMOUNTS).collect());
        }

        if base.contract_type.is_none() {
            base.contract_type = Some(Self::classify_contract_type(full_text));
        }

        info!(
            "Metadata extracted: {}, {} parties",
            base.contract_type.as_deref().unwrap_or("unknown"),
            base.parties.as_ref().map_or(0, Vec::len)
        );
        base
    }

    /// Parties from the header region: at most two, each 4-99 characters
    fn extract_parties(text: &str) -> Option<Vec<String>> {
        let header = take_chars(text, doc_constants::HEADER_REGION);

        for (index, pattern) in PARTY_PATTERNS.iter().enumerate() {
            let mut candidates: Vec<String> = Vec::new();

            for captures in pattern.captures_iter(&header).take(2) {
                // The first two patterns capture both parties; the third
                // captures a single company name per line
                for group in captures.iter().skip(1).flatten() {
                    candidates.push(group.as_str().trim().to_string());
                }
            }

            let parties: Vec<String> = candidates
                .into_iter()
                .filter(|p| p.len() > 3 && p.len() < 100)
                .collect();

            if parties.len() >= doc_constants::MAX_PARTIES {
                debug!("parties matched by pattern {index}");
                return Some(parties.into_iter().take(doc_constants::MAX_PARTIES).collect());
            }
        }

        None
    }

    /// Effective date from the header region, cleaned of stray punctuation
    fn extract_effective_date(text: &str) -> Option<String> {
        let header = take_chars(text, doc_constants::HEADER_REGION);

        for pattern in DATE_PATTERNS.iter() {
            if let Some(captures) = pattern.captures(&header) {
                let raw = captures.get(1)?.as_str().trim();
                let cleaned = DATE_CLEANUP.replace_all(raw, "").trim().to_string();
                if cleaned.len() > 3 && cleaned.len() < 50 {
                    return Some(cleaned);
                }
            }
        }

        None
    }

    /// All distinct monetary amounts, first-seen order
    fn extract_amounts(text: &str) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        AMOUNT_PATTERN
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .filter(|amount| seen.insert(amount.clone()))
            .collect()
    }

    /// Contract type by keyword voting over the opening region
    fn classify_contract_type(text: &str) -> String {
        let opening = take_chars(text, doc_constants::TYPE_REGION).to_lowercase();

        let type_for = |terms: &[&str]| terms.iter().any(|t| opening.contains(t));

        if type_for(&["non-disclosure", "nda", "confidential information"]) {
            "NDA".to_string()
        } else if type_for(&["service agreement", "statement of work", "sow"]) {
            "Service Agreement".to_string()
        } else if type_for(&["employment agreement", "offer letter", "employee"]) {
            "Employment Contract".to_string()
        } else if type_for(&["master service", "msa"]) {
            "Master Service Agreement".to_string()
        } else if type_for(&["purchase order", "sales agreement"]) {
            "Purchase Agreement".to_string()
        } else {
            "General Contract".to_string()
        }
    }
}
