//! Vector Store
//!
//! SQLite-backed reference corpus with two collections:
//!
//! - `prototypes`: one seed document per target category, used for coarse
//!   similarity gating. Auto-initialized when empty.
//! - `golden_standards`: labeled exemplar clauses tagged category ×
//!   risk_level ∈ {safe, risky}.
//!
//! Embeddings are stored as little-endian f32 blobs; queries run an exact
//! cosine scan in-process. Callers treat similarity as monotone preference
//! (`similarity = 1 − distance` under the cosine-distance convention).
//! The corpus is read-only on the online path; `add_verified_clause` is the
//! offline admin entry point.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::constants::corpus as corpus_constants;
use crate::rag::embedding::{SharedEmbedder, cosine_similarity};
use crate::types::{ClauseError, Result};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS prototypes (
    id        TEXT PRIMARY KEY,
    category  TEXT NOT NULL,
    document  TEXT NOT NULL,
    embedding BLOB NOT NULL
);

CREATE TABLE IF NOT EXISTS golden_standards (
    id         TEXT PRIMARY KEY,
    category   TEXT NOT NULL,
    risk_level TEXT NOT NULL,
    source     TEXT NOT NULL DEFAULT 'corpus',
    document   TEXT NOT NULL,
    embedding  BLOB NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_gold_category
    ON golden_standards(category, risk_level);
";

/// Shared store handle
pub type SharedVectorStore = Arc<VectorStore>;

/// A prototype match: category plus similarity to its seed document
#[derive(Debug, Clone)]
pub struct PrototypeMatch {
    pub category: String,
    pub similarity: f64,
}

/// An exemplar match from the golden-standards collection
#[derive(Debug, Clone)]
pub struct ExemplarMatch {
    pub text: String,
    pub category: String,
    pub risk_level: String,
    pub similarity: f64,
}

/// Corpus statistics grouped by metadata
#[derive(Debug, Clone, Default)]
pub struct CorpusStats {
    pub total_clauses: usize,
    pub by_category: BTreeMap<String, usize>,
    pub by_risk_level: BTreeMap<String, usize>,
}

/// SQLite-backed prototype and exemplar store
pub struct VectorStore {
    pool: Pool<SqliteConnectionManager>,
    embedder: SharedEmbedder,
    /// (category, seed document) pairs for prototype auto-initialization
    seeds: Vec<(String, String)>,
}

impl VectorStore {
    /// Open (or create) the store at `path` with the built-in prototype
    /// seeds
    pub fn open(path: &Path, embedder: SharedEmbedder) -> Result<Self> {
        Self::open_with_seeds(path, embedder, default_seeds())
    }

    /// Open (or create) the store at `path` with configured prototype
    /// seeds
    pub fn open_with_seeds(
        path: &Path,
        embedder: SharedEmbedder,
        seeds: Vec<(String, String)>,
    ) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder()
            .max_size(8)
            .build(manager)
            .map_err(|e| ClauseError::Storage(format!("connection pool: {e}")))?;

        let store = Self {
            pool,
            embedder,
            seeds,
        };
        store.conn()?.execute_batch(SCHEMA)?;
        info!("Vector store ready: {}", path.display());
        Ok(store)
    }

    /// In-memory store for tests and ephemeral runs
    pub fn open_in_memory(embedder: SharedEmbedder) -> Result<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| ClauseError::Storage(format!("connection pool: {e}")))?;

        let store = Self {
            pool,
            embedder,
            seeds: default_seeds(),
        };
        store.conn()?.execute_batch(SCHEMA)?;
        Ok(store)
    }

    fn conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| ClauseError::Storage(format!("acquire connection: {e}")))
    }

    // =========================================================================
    // Prototypes
    // =========================================================================

    /// Top-k prototype matches for `text` by cosine similarity.
    ///
    /// Auto-initializes the collection with one seed document per target
    /// category when empty.
    pub fn query_prototypes(&self, text: &str, k: usize) -> Result<Vec<PrototypeMatch>> {
        self.ensure_prototypes_seeded()?;

        let query = self.embedder.embed(text)?;
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT category, embedding FROM prototypes")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
        })?;

        let mut matches: Vec<PrototypeMatch> = Vec::new();
        for row in rows {
            let (category, blob) = row?;
            let similarity = cosine_similarity(&query, &decode_embedding(&blob));
            matches.push(PrototypeMatch {
                category,
                similarity,
            });
        }

        matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        matches.truncate(k);
        Ok(matches)
    }

    fn ensure_prototypes_seeded(&self) -> Result<()> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM prototypes", [], |row| row.get(0))?;
        if count > 0 {
            return Ok(());
        }

        info!("Seeding prototype collection");
        for (category, seed) in &self.seeds {
            let id = format!(
                "prototype_{}",
                category.to_lowercase().replace(' ', "_")
            );
            let embedding = self.embedder.embed(seed)?;
            conn.execute(
                "INSERT INTO prototypes (id, category, document, embedding)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id, category, seed, encode_embedding(&embedding)],
            )?;
        }
        Ok(())
    }

    // =========================================================================
    // Golden Standards
    // =========================================================================

    /// Top-k exemplar matches for `text`, filtered to `category` and, when
    /// given, `risk_level` (ANDed)
    pub fn query_category(
        &self,
        text: &str,
        category: &str,
        risk_level: Option<&str>,
        k: usize,
    ) -> Result<Vec<ExemplarMatch>> {
        let query = self.embedder.embed(text)?;
        let conn = self.conn()?;

        let mut matches: Vec<ExemplarMatch> = Vec::new();
        let collect = |row: &rusqlite::Row<'_>| -> rusqlite::Result<(String, String, String, Vec<u8>)> {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Vec<u8>>(3)?,
            ))
        };

        if let Some(level) = risk_level {
            let mut stmt = conn.prepare(
                "SELECT document, category, risk_level, embedding
                 FROM golden_standards WHERE category = ?1 AND risk_level = ?2",
            )?;
            let rows = stmt.query_map(params![category, level], collect)?;
            for row in rows {
                matches.push(to_exemplar(row?, &query));
            }
        } else {
            let mut stmt = conn.prepare(
                "SELECT document, category, risk_level, embedding
                 FROM golden_standards WHERE category = ?1",
            )?;
            let rows = stmt.query_map(params![category], collect)?;
            for row in rows {
                matches.push(to_exemplar(row?, &query));
            }
        }

        matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        matches.truncate(k);
        debug!(
            category,
            risk_level = risk_level.unwrap_or("any"),
            hits = matches.len(),
            "exemplar query"
        );
        Ok(matches)
    }

    /// Append a verified clause to the golden standards. Outside the online
    /// path: analyses read the corpus as immutable.
    pub fn add_verified_clause(&self, text: &str, category: &str, risk_level: &str) -> Result<String> {
        let id = format!("verified_{}", &Uuid::new_v4().simple().to_string()[..8]);
        let embedding = self.embedder.embed(text)?;

        self.conn()?.execute(
            "INSERT INTO golden_standards (id, category, risk_level, source, document, embedding)
             VALUES (?1, ?2, ?3, 'user_feedback_sync', ?4, ?5)",
            params![id, category, risk_level, text, encode_embedding(&embedding)],
        )?;

        info!(category, risk_level, %id, "added verified clause");
        Ok(id)
    }

    /// Exemplar counts grouped by category and risk level
    pub fn stats(&self) -> Result<CorpusStats> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT category, risk_level FROM golden_standards")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut stats = CorpusStats::default();
        for row in rows {
            let (category, risk_level) = row?;
            stats.total_clauses += 1;
            *stats.by_category.entry(category).or_insert(0) += 1;
            *stats.by_risk_level.entry(risk_level).or_insert(0) += 1;
        }
        Ok(stats)
    }
}

fn to_exemplar(
    (document, category, risk_level, blob): (String, String, String, Vec<u8>),
    query: &[f32],
) -> ExemplarMatch {
    ExemplarMatch {
        similarity: cosine_similarity(query, &decode_embedding(&blob)),
        text: document,
        category,
        risk_level,
    }
}

/// The built-in prototype seeds
fn default_seeds() -> Vec<(String, String)> {
    corpus_constants::PROTOTYPE_SEEDS
        .iter()
        .map(|(category, seed)| ((*category).to_string(), (*seed).to_string()))
        .collect()
}

/// f32 slice → little-endian blob
fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// little-endian blob → f32 vector
fn decode_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::embedding::{EMBEDDING_DIMENSIONS, HashEmbedder};

    fn store() -> VectorStore {
        let embedder: SharedEmbedder = Arc::new(HashEmbedder::new(EMBEDDING_DIMENSIONS));
        VectorStore::open_in_memory(embedder).expect("store")
    }

    #[test]
    fn test_embedding_blob_round_trip() {
        let original = vec![0.25f32, -1.5, 3.75, 0.0];
        let decoded = decode_embedding(&encode_embedding(&original));
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_prototypes_auto_seed() {
        let store = store();
        let matches = store
            .query_prototypes("termination clause", 3)
            .expect("query");
        assert_eq!(matches.len(), 3);
        let categories: Vec<&str> = matches.iter().map(|m| m.category.as_str()).collect();
        for target in corpus_constants::TARGET_CATEGORIES {
            assert!(categories.contains(target));
        }
    }

    #[test]
    fn test_prototype_top1_orders_by_similarity() {
        let store = store();
        // Query with a seed document verbatim; its category must win with
        // similarity ~1.0
        let seed = corpus_constants::PROTOTYPE_SEEDS[0];
        let matches = store.query_prototypes(seed.1, 1).expect("query");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].category, seed.0);
        assert!(matches[0].similarity > 0.99);
    }

    #[test]
    fn test_query_category_filters_on_metadata() {
        let store = store();
        store
            .add_verified_clause(
                "Either party may terminate upon 30 days written notice.",
                "Unilateral Termination",
                "safe",
            )
            .expect("add");
        store
            .add_verified_clause(
                "Company may terminate at any time without cause.",
                "Unilateral Termination",
                "risky",
            )
            .expect("add");
        store
            .add_verified_clause(
                "Contractor shall not compete for two years.",
                "Non-Compete",
                "risky",
            )
            .expect("add");

        let safe = store
            .query_category("terminate", "Unilateral Termination", Some("safe"), 5)
            .expect("query");
        assert_eq!(safe.len(), 1);
        assert_eq!(safe[0].risk_level, "safe");

        let all = store
            .query_category("terminate", "Unilateral Termination", None, 5)
            .expect("query");
        assert_eq!(all.len(), 2);

        let other = store
            .query_category("terminate", "Unlimited Liability", None, 5)
            .expect("query");
        assert!(other.is_empty());
    }

    #[test]
    fn test_add_verified_clause_id_and_stats() {
        let store = store();
        let id = store
            .add_verified_clause("clause text", "Non-Compete", "safe")
            .expect("add");
        assert!(id.starts_with("verified_"));
        assert_eq!(id.len(), "verified_".len() + 8);

        let stats = store.stats().expect("stats");
        assert_eq!(stats.total_clauses, 1);
        assert_eq!(stats.by_category.get("Non-Compete"), Some(&1));
        assert_eq!(stats.by_risk_level.get("safe"), Some(&1));
    }

    #[test]
    fn test_identical_text_scores_near_one() {
        let store = store();
        let text = "Contractor shall be liable for all damages without limitation.";
        store
            .add_verified_clause(text, "Unlimited Liability", "risky")
            .expect("add");

        let matches = store
            .query_category(text, "Unlimited Liability", Some("risky"), 1)
            .expect("query");
        assert_eq!(matches.len(), 1);
        assert!(matches[0].similarity > 0.99);
    }

    #[test]
    fn test_persistent_store_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("corpus").join("gold.db");
        let embedder: SharedEmbedder = Arc::new(HashEmbedder::new(EMBEDDING_DIMENSIONS));

        {
            let store = VectorStore::open(&path, embedder.clone()).expect("open");
            store
                .add_verified_clause("clause", "Non-Compete", "risky")
                .expect("add");
        }

        let store = VectorStore::open(&path, embedder).expect("reopen");
        assert_eq!(store.stats().expect("stats").total_clauses, 1);
    }
}
