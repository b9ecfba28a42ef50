//! Definition Extraction
//!
//! Two regex passes over the full text: quoted terms followed by a defining
//! verb, and "As used herein" constructions. Each definition gets the
//! nearest preceding `N.N` section token when one appears in the 100
//! characters before the match. Terms deduplicate case-insensitively.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;

use crate::types::Definition;

static QUOTED_TERM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)"([^"]{3,50})"\s+(?:means?|shall mean|refers? to|is defined as)\s+([^.;]+[.;])"#)
        .expect("static regex")
});

static AS_USED_HEREIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)As used (?:herein|in this Agreement),\s+"([^"]{3,50})"\s+(?:means?|refers? to)\s+([^.;]+[.;])"#)
        .expect("static regex")
});

static SECTION_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+\.\d+)").expect("static regex"));

/// Regex-driven definition extraction
pub struct DefinitionExtractor;

impl DefinitionExtractor {
    pub fn extract(full_text: &str) -> Vec<Definition> {
        let mut definitions: Vec<Definition> = Vec::new();

        for captures in QUOTED_TERM.captures_iter(full_text) {
            let (Some(term), Some(body)) = (captures.get(1), captures.get(2)) else {
                continue;
            };

            let section = Self::preceding_section(full_text, term.start());
            definitions.push(Definition {
                term: term.as_str().trim().to_string(),
                definition: body.as_str().trim().to_string(),
                section,
            });
        }

        for captures in AS_USED_HEREIN.captures_iter(full_text) {
            let (Some(term), Some(body)) = (captures.get(1), captures.get(2)) else {
                continue;
            };

            definitions.push(Definition {
                term: term.as_str().trim().to_string(),
                definition: body.as_str().trim().to_string(),
                section: None,
            });
        }

        let mut seen: HashSet<String> = HashSet::new();
        let unique: Vec<Definition> = definitions
            .into_iter()
            .filter(|d| seen.insert(d.term.to_lowercase()))
            .collect();

        debug!("Found {} definitions", unique.len());
        unique
    }

    /// Nearest `N.N` token in the 100 characters before `match_start`
    /// (a byte offset into `full_text`)
    fn preceding_section(full_text: &str, match_start: usize) -> Option<String> {
        let before = &full_text[..match_start];
        let context: String = before
            .chars()
            .rev()
            .take(100)
            .collect::<Vec<char>>()
            .into_iter()
            .rev()
            .collect();

        SECTION_TOKEN
            .find_iter(&context)
            .last()
            .map(|m| m.as_str().to_string())
    }
}
