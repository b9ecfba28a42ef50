//! Semantic Chunker
//!
//! Splits cleaned text into sentences (protecting honorifics and corporate
//! suffixes from mid-word period splits), embeds every sentence in one
//! batch, and places breakpoints where the consecutive-sentence cosine
//! similarity falls below the configured percentile of the observed score
//! array. Chunks shorter than the minimum are dropped; longer ones are
//! truncated to the maximum. Spans and context windows count characters.

use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info};

use crate::config::ChunkingConfig;
use crate::rag::embedding::{SharedEmbedder, cosine_similarity};
use crate::text::{char_count, slice_chars, take_chars};
use crate::types::{Result, SemanticChunk};

static HONORIFIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z][a-z]?)\.\s").expect("static regex"));
static CORPORATE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(Inc|LLC|Corp|Ltd)\.\s").expect("static regex"));
static SENTENCE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+\s+").expect("static regex"));

const PERIOD_PLACEHOLDER: &str = "<PERIOD>";

/// Embedding-driven chunker
pub struct SemanticChunker {
    embedder: SharedEmbedder,
    config: ChunkingConfig,
}

impl SemanticChunker {
    pub fn new(embedder: SharedEmbedder, config: ChunkingConfig) -> Self {
        Self { embedder, config }
    }

    /// Chunk the cleaned full text.
    ///
    /// Single-sentence documents produce exactly one chunk with the whole
    /// text; empty input produces no chunks.
    pub fn chunk_text(&self, full_text: &str) -> Result<Vec<SemanticChunk>> {
        debug!("Starting semantic chunking");

        if full_text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let sentences = split_sentences(full_text);
        debug!("Split into {} sentences", sentences.len());

        if sentences.len() < 2 {
            let text = full_text.trim();
            return Ok(SemanticChunk::new(
                SemanticChunk::format_id(1),
                text,
                0,
                char_count(text),
            )
            .into_iter()
            .collect());
        }

        let refs: Vec<&str> = sentences.iter().map(String::as_str).collect();
        let embeddings = self.embedder.embed_batch(&refs)?;

        let breakpoints = self.find_breakpoints(&embeddings, sentences.len());
        debug!("Found {} breakpoints", breakpoints.len());

        let chunks = self.assemble_chunks(full_text, &sentences, &breakpoints);
        info!("Created {} semantic chunks", chunks.len());
        Ok(chunks)
    }

    /// Breakpoints bracket sentence runs: always 0 and the sentence count,
    /// plus every position whose preceding similarity score falls below the
    /// percentile threshold
    fn find_breakpoints(&self, embeddings: &[Vec<f32>], sentence_count: usize) -> Vec<usize> {
        let similarities: Vec<f64> = embeddings
            .windows(2)
            .map(|pair| cosine_similarity(&pair[0], &pair[1]))
            .collect();

        if similarities.is_empty() {
            return vec![0, sentence_count];
        }

        let threshold = percentile(&similarities, self.config.similarity_percentile);

        let mut breakpoints = vec![0];
        for (index, similarity) in similarities.iter().enumerate() {
            if *similarity < threshold {
                breakpoints.push(index + 1);
            }
        }

        if breakpoints.last() != Some(&sentence_count) {
            breakpoints.push(sentence_count);
        }

        breakpoints
    }

    /// Join sentences between consecutive breakpoints into chunks, applying
    /// the length bounds and locating each chunk's character span
    fn assemble_chunks(
        &self,
        full_text: &str,
        sentences: &[String],
        breakpoints: &[usize],
    ) -> Vec<SemanticChunk> {
        let total_chars = char_count(full_text);
        let mut chunks = Vec::new();

        for (interval, window) in breakpoints.windows(2).enumerate() {
            let run = &sentences[window[0]..window[1]];
            if run.is_empty() {
                continue;
            }

            let mut chunk_text = run.join(" ");
            if char_count(&chunk_text) < self.config.min_chunk_length {
                continue;
            }
            if char_count(&chunk_text) > self.config.max_chunk_length {
                chunk_text = take_chars(&chunk_text, self.config.max_chunk_length);
            }

            // Locate the span by the first sentence's position (0 when the
            // sentence was reassembled across protected periods)
            let start_char = full_text
                .find(run[0].as_str())
                .map(|byte_idx| char_count(&full_text[..byte_idx]))
                .unwrap_or(0);
            let end_char = (start_char + char_count(&chunk_text)).min(total_chars.max(start_char));

            let preceding = slice_chars(
                full_text,
                start_char.saturating_sub(self.config.overlap),
                start_char,
            )
            .trim()
            .to_string();
            let following = slice_chars(full_text, end_char, end_char + self.config.overlap)
                .trim()
                .to_string();

            if let Some(chunk) = SemanticChunk::new(
                SemanticChunk::format_id(interval + 1),
                &chunk_text,
                start_char,
                end_char,
            ) {
                chunks.push(chunk.with_context(Some(preceding), Some(following)));
            }
        }

        chunks
    }
}

/// Sentence split protecting honorifics (J. Smith) and corporate suffixes
/// (Inc., LLC., Corp., Ltd.) from being treated as sentence boundaries.
/// Sentences shorter than the minimum length are dropped.
fn split_sentences(text: &str) -> Vec<String> {
    let protected = HONORIFIC.replace_all(text, format!("${{1}}{PERIOD_PLACEHOLDER} ").as_str());
    let protected =
        CORPORATE_SUFFIX.replace_all(&protected, format!("${{1}}{PERIOD_PLACEHOLDER} ").as_str());

    SENTENCE_BOUNDARY
        .split(&protected)
        .map(|s| s.replace(PERIOD_PLACEHOLDER, ".").trim().to_string())
        .filter(|s| char_count(s) > crate::constants::chunking::MIN_SENTENCE_LENGTH)
        .collect()
}

/// Linear-interpolated percentile of `values` at fraction `q` in [0, 1]
fn percentile(values: &[f64], q: f64) -> f64 {
    let mut sorted: Vec<f64> = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    if sorted.len() == 1 {
        return sorted[0];
    }

    let rank = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;

    sorted[lower] + weight * (sorted[upper] - sorted[lower])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::embedding::{EMBEDDING_DIMENSIONS, HashEmbedder};
    use std::sync::Arc;

    fn chunker() -> SemanticChunker {
        SemanticChunker::new(
            Arc::new(HashEmbedder::new(EMBEDDING_DIMENSIONS)),
            ChunkingConfig::default(),
        )
    }

    #[test]
    fn test_percentile_interpolates() {
        let values = vec![0.0, 1.0, 2.0, 3.0, 4.0];
        assert!((percentile(&values, 0.5) - 2.0).abs() < 1e-9);
        assert!((percentile(&values, 0.75) - 3.0).abs() < 1e-9);
        assert!((percentile(&values, 0.0) - 0.0).abs() < 1e-9);
        assert!((percentile(&values, 1.0) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_split_protects_corporate_suffixes() {
        let text = "This Agreement binds Acme Inc. and its affiliates completely. \
                    The second sentence covers termination rights in detail.";
        let sentences = split_sentences(text);
        assert_eq!(sentences.len(), 2);
        assert!(sentences[0].contains("Acme Inc."));
    }

    #[test]
    fn test_split_drops_short_fragments() {
        let text = "Short one. This sentence is comfortably longer than twenty characters.";
        let sentences = split_sentences(text);
        assert_eq!(sentences.len(), 1);
    }

    #[test]
    fn test_single_sentence_document_single_chunk() {
        let text = "Company may terminate this Agreement at any time without cause or notice.";
        let chunks = chunker().chunk_text(text).expect("chunks");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, "chunk_001");
        assert_eq!(chunks[0].text, text);
        assert_eq!(chunks[0].start_char, 0);
        assert_eq!(chunks[0].end_char, char_count(text));
    }

    #[test]
    fn test_empty_input_no_chunks() {
        assert!(chunker().chunk_text("  ").expect("chunks").is_empty());
    }

    #[test]
    fn test_chunks_ordered_and_bounded() {
        let sentence = "The contracting parties agree to the detailed obligations set out in this section of the agreement";
        let text = (0..12)
            .map(|i| format!("{sentence} number {i} with extra differentiating terminology appended."))
            .collect::<Vec<_>>()
            .join(" ");

        let chunks = chunker().chunk_text(&text).expect("chunks");
        assert!(!chunks.is_empty());

        let config = ChunkingConfig::default();
        let mut previous_end = 0usize;
        for chunk in &chunks {
            assert!(char_count(&chunk.text) <= config.max_chunk_length);
            assert!(chunk.start_char >= previous_end || chunk.start_char == 0);
            assert!(chunk.end_char > chunk.start_char);
            previous_end = chunk.end_char;
        }
    }

    #[test]
    fn test_sentinel_text_single_low_signal_chunk() {
        let chunks = chunker()
            .chunk_text("OCR FAILED: Could not extract text from this document.")
            .expect("chunks");
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.starts_with("OCR FAILED"));
    }

    #[test]
    fn test_single_long_sentence_kept_whole() {
        // Whole-document brevity: one sentence with no internal boundaries
        // stays one chunk, exempt from the length bounds
        let text = format!(
            "The parties agree that {} shall apply in every case",
            "very ".repeat(400)
        );
        let chunks = chunker().chunk_text(&text).expect("chunks");
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.starts_with("The parties agree"));
    }
}
