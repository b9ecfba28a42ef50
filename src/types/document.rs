//! Document Model
//!
//! Records produced by Stage 1: metadata, extracted definitions, and the
//! ordered semantic chunks over the cleaned full text. All character
//! positions count Unicode scalar values, never bytes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Document Metadata
// =============================================================================

/// Document-level metadata, created by Stage 1 and immutable thereafter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub filename: String,
    pub file_size: u64,
    pub page_count: usize,
    pub extraction_date: DateTime<Utc>,

    pub contract_type: Option<String>,
    /// At most two parties, extracted from the header region
    pub parties: Option<Vec<String>>,
    pub effective_date: Option<String>,
    /// At most five monetary amounts mentioned in the document
    pub mentioned_amounts: Option<Vec<String>>,
}

impl DocumentMetadata {
    pub fn new(filename: impl Into<String>, file_size: u64, page_count: usize) -> Self {
        Self {
            filename: filename.into(),
            file_size,
            page_count,
            extraction_date: Utc::now(),
            contract_type: None,
            parties: None,
            effective_date: None,
            mentioned_amounts: None,
        }
    }
}

// =============================================================================
// Definitions
// =============================================================================

/// A defined term extracted from the contract text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Definition {
    pub term: String,
    pub definition: String,
    /// Nearest preceding `N.N` section token, when present
    pub section: Option<String>,
}

impl Definition {
    /// Lowercased term → definition map for quick lookup
    pub fn lookup_map(
        definitions: &[Definition],
    ) -> std::collections::HashMap<String, String> {
        definitions
            .iter()
            .map(|d| (d.term.to_lowercase(), d.definition.clone()))
            .collect()
    }
}

// =============================================================================
// Semantic Chunks
// =============================================================================

/// A semantically coherent span of contract text; the unit of analysis.
///
/// Invariants: chunks are ordered by source position, spans are half-open
/// `[start_char, end_char)` into the cleaned full text and do not overlap,
/// and `text` is non-empty and trimmed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticChunk {
    /// Stable id of the form `chunk_NNN` (1-based, zero-padded)
    pub id: String,
    pub text: String,
    pub start_char: usize,
    pub end_char: usize,
    pub word_count: usize,

    /// Up to 50 characters of preceding context
    pub preceding_text: Option<String>,
    /// Up to 50 characters of following context
    pub following_text: Option<String>,
}

impl SemanticChunk {
    /// Build a chunk, trimming text and recomputing the word count.
    /// Returns `None` when the trimmed text is empty.
    pub fn new(
        id: impl Into<String>,
        text: &str,
        start_char: usize,
        end_char: usize,
    ) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self {
            id: id.into(),
            text: trimmed.to_string(),
            start_char,
            end_char,
            word_count: trimmed.split_whitespace().count(),
            preceding_text: None,
            following_text: None,
        })
    }

    pub fn with_context(
        mut self,
        preceding: Option<String>,
        following: Option<String>,
    ) -> Self {
        self.preceding_text = preceding.filter(|s| !s.is_empty());
        self.following_text = following.filter(|s| !s.is_empty());
        self
    }

    /// Format a chunk id from a 1-based ordinal
    pub fn format_id(ordinal: usize) -> String {
        format!("chunk_{ordinal:03}")
    }
}

// =============================================================================
// Processed Document
// =============================================================================

/// Output of Stage 1: everything downstream stages need
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedDocument {
    pub metadata: DocumentMetadata,
    pub full_text: String,
    pub definitions: Vec<Definition>,
    pub chunks: Vec<SemanticChunk>,

    pub total_chunks: usize,
    /// Mean chunk length in words
    pub avg_chunk_length: f64,
    pub processing_time_seconds: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_rejects_empty_text() {
        assert!(SemanticChunk::new("chunk_001", "   ", 0, 3).is_none());
        assert!(SemanticChunk::new("chunk_001", "", 0, 0).is_none());
    }

    #[test]
    fn test_chunk_trims_and_counts_words() {
        let chunk = SemanticChunk::new("chunk_001", "  either party may terminate  ", 0, 30)
            .expect("non-empty chunk");
        assert_eq!(chunk.text, "either party may terminate");
        assert_eq!(chunk.word_count, 4);
    }

    #[test]
    fn test_chunk_id_format() {
        assert_eq!(SemanticChunk::format_id(1), "chunk_001");
        assert_eq!(SemanticChunk::format_id(42), "chunk_042");
        assert_eq!(SemanticChunk::format_id(120), "chunk_120");
    }

    #[test]
    fn test_context_drops_empty_windows() {
        let chunk = SemanticChunk::new("chunk_001", "text body here", 0, 14)
            .expect("non-empty chunk")
            .with_context(Some(String::new()), Some("after".to_string()));
        assert!(chunk.preceding_text.is_none());
        assert_eq!(chunk.following_text.as_deref(), Some("after"));
    }

    #[test]
    fn test_definition_lookup_map_lowercases_terms() {
        let defs = vec![Definition {
            term: "Confidential Information".to_string(),
            definition: "all non-public information".to_string(),
            section: Some("1.1".to_string()),
        }];
        let map = Definition::lookup_map(&defs);
        assert_eq!(
            map.get("confidential information").map(String::as_str),
            Some("all non-public information")
        );
    }
}
