//! Category Detector (Stage 2)
//!
//! Three-zone retrieval-augmented classification. The chunk is matched
//! against the category prototypes; the similarity lands it in one of
//! three zones:
//!
//! - below the noise threshold: ignore
//! - at or above the safe threshold *and* within the safe-exemplar cutoff
//!   of a known safe exemplar: accept without review
//! - everything else in between: the courtroom, where the adversarial
//!   agents adjudicate
//!
//! The safe zone requires both gates because a clause can match the
//! category closely while still deviating from canonical safe phrasing.

use tracing::{debug, instrument};

use crate::config::ZoneConfig;
use crate::rag::store::SharedVectorStore;
use crate::types::{CategoryDetection, Result, SemanticChunk, Zone};

const EXEMPLARS_PER_SIDE: usize = 3;

/// Retrieval-backed category detector
pub struct CategoryDetector {
    store: SharedVectorStore,
    zones: ZoneConfig,
}

impl CategoryDetector {
    pub fn new(store: SharedVectorStore, zones: ZoneConfig) -> Self {
        Self { store, zones }
    }

    /// Detect the chunk's category and triage zone
    #[instrument(skip(self, chunk), fields(chunk_id = %chunk.id))]
    pub fn detect(&self, chunk: &SemanticChunk) -> Result<CategoryDetection> {
        let matches = self.store.query_prototypes(&chunk.text, 1)?;

        let Some(top) = matches.first() else {
            return Ok(CategoryDetection::unknown());
        };

        let category = top.category.clone();
        let similarity = top.similarity;

        let (zone, needs_review, reasoning) = self.apply_zone_policy(similarity, &category, &chunk.text)?;

        let (safe_examples, risky_examples) = if needs_review {
            (
                self.retrieve_examples(&chunk.text, &category, "safe")?,
                self.retrieve_examples(&chunk.text, &category, "risky")?,
            )
        } else {
            (Vec::new(), Vec::new())
        };

        debug!(%category, %zone, similarity, "detection complete");

        Ok(CategoryDetection {
            category,
            confidence: similarity,
            similarity_to_prototype: similarity,
            zone,
            needs_agent_review: needs_review,
            retrieved_safe_examples: safe_examples,
            retrieved_risky_examples: risky_examples,
            decision_reasoning: reasoning,
        })
    }

    fn apply_zone_policy(
        &self,
        similarity: f64,
        category: &str,
        text: &str,
    ) -> Result<(Zone, bool, String)> {
        if similarity < self.zones.noise_threshold {
            return Ok((
                Zone::Noise,
                false,
                format!(
                    "Similarity {:.1}% below noise threshold. Not related to target categories.",
                    similarity * 100.0
                ),
            ));
        }

        if similarity >= self.zones.safe_threshold {
            let safe_matches = self.store.query_category(text, category, Some("safe"), 1)?;

            if let Some(best) = safe_matches.first()
                && best.similarity > self.zones.safe_exemplar_cutoff
            {
                return Ok((
                    Zone::Safe,
                    false,
                    format!(
                        "High similarity to {category} prototype ({:.1}%) and matches safe \
                         standard ({:.1}%).",
                        similarity * 100.0,
                        best.similarity * 100.0
                    ),
                ));
            }

            return Ok((
                Zone::Courtroom,
                true,
                format!(
                    "High category similarity ({:.1}%) but deviates from safe standards. \
                     Requires agent review.",
                    similarity * 100.0
                ),
            ));
        }

        Ok((
            Zone::Courtroom,
            true,
            format!(
                "Moderate similarity to {category} ({:.1}%). Falls in grey zone - requires \
                 agent analysis.",
                similarity * 100.0
            ),
        ))
    }

    fn retrieve_examples(&self, text: &str, category: &str, risk_level: &str) -> Result<Vec<String>> {
        Ok(self
            .store
            .query_category(text, category, Some(risk_level), EXEMPLARS_PER_SIDE)?
            .into_iter()
            .map(|m| m.text)
            .collect())
    }
}
