//! Sentence Embeddings
//!
//! Embedding generation for the retrieval layer. The model identity is
//! fixed: a 384-dimension MiniLM-class sentence embedder (all-MiniLM-L6-v2
//! via fastembed). Without the `semantic-embeddings` feature a
//! deterministic hash-based embedder stands in; it clusters by lexical
//! overlap, not semantics, and exists for tests and constrained builds.

use std::sync::{Arc, OnceLock};

use crate::types::Result;

/// Embedding dimensions of the all-MiniLM-L6-v2 model.
///
/// Authoritative for the whole crate; the vector store and chunker both
/// assume vectors of this length.
pub const EMBEDDING_DIMENSIONS: usize = 384;

/// Shared embedder handle
pub type SharedEmbedder = Arc<dyn Embedder>;

/// Trait for embedding generators.
///
/// Implementations must be thread-safe; the embedder is a read-mostly
/// process-wide singleton shared across analyses.
pub trait Embedder: Send + Sync {
    /// Embedding dimensions
    fn dimensions(&self) -> usize;

    /// Embed one text
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch; the default calls `embed` sequentially
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Cosine similarity between two embedding vectors.
///
/// Returns 0.0 for mismatched lengths or zero-magnitude vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum();
    let mag_a: f64 = a.iter().map(|x| f64::from(*x) * f64::from(*x)).sum::<f64>().sqrt();
    let mag_b: f64 = b.iter().map(|x| f64::from(*x) * f64::from(*x)).sum::<f64>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}

/// Process-wide embedder singleton, lazily initialized at first use
static SHARED_EMBEDDER: OnceLock<SharedEmbedder> = OnceLock::new();

/// The shared embedder for this process: fastembed when the
/// `semantic-embeddings` feature is enabled, the hash fallback otherwise
pub fn shared_embedder() -> SharedEmbedder {
    SHARED_EMBEDDER
        .get_or_init(|| {
            #[cfg(feature = "semantic-embeddings")]
            {
                Arc::new(FastEmbedEmbedder::new())
            }
            #[cfg(not(feature = "semantic-embeddings"))]
            {
                Arc::new(HashEmbedder::new(EMBEDDING_DIMENSIONS))
            }
        })
        .clone()
}

// =============================================================================
// FastEmbed Implementation
// =============================================================================

#[cfg(feature = "semantic-embeddings")]
mod fastembed_impl {
    use super::*;
    use crate::types::ClauseError;
    use std::sync::Mutex;

    /// Lazily loaded model; `Mutex` because fastembed embedding takes
    /// `&mut self`
    static MODEL: OnceLock<Mutex<fastembed::TextEmbedding>> = OnceLock::new();

    /// all-MiniLM-L6-v2 embedder via fastembed.
    ///
    /// The ONNX model is loaded on the first embed call to keep cold start
    /// cheap; subsequent calls share the cached instance.
    pub struct FastEmbedEmbedder {
        model_name: &'static str,
    }

    impl FastEmbedEmbedder {
        pub fn new() -> Self {
            Self {
                model_name: "all-MiniLM-L6-v2",
            }
        }

        pub fn model_name(&self) -> &'static str {
            self.model_name
        }

        fn model() -> Result<&'static Mutex<fastembed::TextEmbedding>> {
            if let Some(model) = MODEL.get() {
                return Ok(model);
            }

            let options =
                fastembed::InitOptions::new(fastembed::EmbeddingModel::AllMiniLML6V2)
                    .with_show_download_progress(false);
            let model = fastembed::TextEmbedding::try_new(options).map_err(|e| {
                ClauseError::Embedding(format!("Failed to load embedding model: {e}"))
            })?;

            let _ = MODEL.set(Mutex::new(model));
            MODEL
                .get()
                .ok_or_else(|| ClauseError::Embedding("model init race".to_string()))
        }
    }

    impl Default for FastEmbedEmbedder {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Embedder for FastEmbedEmbedder {
        fn dimensions(&self) -> usize {
            EMBEDDING_DIMENSIONS
        }

        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if text.is_empty() {
                return Err(ClauseError::Embedding("cannot embed empty text".to_string()));
            }

            let mut model = Self::model()?
                .lock()
                .map_err(|e| ClauseError::Embedding(format!("model lock poisoned: {e}")))?;

            let embeddings = model
                .embed([text], None)
                .map_err(|e| ClauseError::Embedding(format!("embedding failed: {e}")))?;

            embeddings
                .into_iter()
                .next()
                .ok_or_else(|| ClauseError::Embedding("no embedding returned".to_string()))
        }

        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }
            if texts.iter().any(|t| t.is_empty()) {
                return Err(ClauseError::Embedding("cannot embed empty text".to_string()));
            }

            let mut model = Self::model()?
                .lock()
                .map_err(|e| ClauseError::Embedding(format!("model lock poisoned: {e}")))?;

            model
                .embed(texts, None)
                .map_err(|e| ClauseError::Embedding(format!("batch embedding failed: {e}")))
        }
    }
}

#[cfg(feature = "semantic-embeddings")]
pub use fastembed_impl::FastEmbedEmbedder;

// =============================================================================
// Hash Fallback
// =============================================================================

/// Deterministic hash-based embedder.
///
/// Combines word-level hashing with character trigram hashing, normalized
/// to unit length so cosine similarity behaves. Lexical overlap only, no
/// semantics; identical texts always map to identical vectors.
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub const fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn hash_str(s: &str) -> u64 {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        s.hash(&mut hasher);
        hasher.finish()
    }

    fn generate(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];

        let normalized: String = text
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c.is_whitespace() {
                    c.to_ascii_lowercase()
                } else {
                    ' '
                }
            })
            .collect();

        for word in normalized.split_whitespace() {
            let hash = Self::hash_str(word);
            let idx = (hash as usize) % self.dimensions;
            let sign = if (hash >> 32) & 1 == 0 { 1.0 } else { -1.0 };
            let magnitude = 1.0 + ((hash >> 16) & 0xFF) as f32 / 255.0;
            embedding[idx] += sign * magnitude;
        }

        let chars: Vec<char> = normalized.chars().collect();
        for window in chars.windows(3) {
            let trigram: String = window.iter().collect();
            let hash = Self::hash_str(&trigram);
            let idx = (hash as usize) % self.dimensions;
            let sign = if (hash >> 32) & 1 == 0 { 0.5 } else { -0.5 };
            embedding[idx] += sign;
        }

        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut embedding {
                *value /= magnitude;
            }
        }

        embedding
    }
}

impl Embedder for HashEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.generate(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical() {
        let a = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_mismatched_lengths() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_cosine_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_hash_embedder_deterministic() {
        let embedder = HashEmbedder::new(EMBEDDING_DIMENSIONS);
        let a = embedder.embed("either party may terminate").expect("embed");
        let b = embedder.embed("either party may terminate").expect("embed");
        assert_eq!(a, b);
        assert_eq!(a.len(), EMBEDDING_DIMENSIONS);
    }

    #[test]
    fn test_hash_embedder_unit_normalized() {
        let embedder = HashEmbedder::new(EMBEDDING_DIMENSIONS);
        let v = embedder.embed("termination clause with notice").expect("embed");
        let magnitude: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_hash_embedder_overlap_beats_disjoint() {
        let embedder = HashEmbedder::new(EMBEDDING_DIMENSIONS);
        let base = embedder
            .embed("company may terminate this agreement at any time")
            .expect("embed");
        let near = embedder
            .embed("company may terminate this agreement with notice")
            .expect("embed");
        let far = embedder
            .embed("quarterly dividends accrue to preferred shareholders")
            .expect("embed");

        let sim_near = cosine_similarity(&base, &near);
        let sim_far = cosine_similarity(&base, &far);
        assert!(sim_near > sim_far);
    }

    #[test]
    fn test_embed_batch_default_impl() {
        let embedder = HashEmbedder::new(64);
        let batch = embedder.embed_batch(&["one", "two"]).expect("batch");
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].len(), 64);
    }
}
