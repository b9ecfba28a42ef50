//! Retrieval Layer
//!
//! Sentence embeddings and the prototype/exemplar vector store.

pub mod embedding;
pub mod store;

pub use embedding::{
    EMBEDDING_DIMENSIONS, Embedder, HashEmbedder, SharedEmbedder, cosine_similarity,
    shared_embedder,
};
pub use store::{CorpusStats, ExemplarMatch, PrototypeMatch, SharedVectorStore, VectorStore};

#[cfg(feature = "semantic-embeddings")]
pub use embedding::FastEmbedEmbedder;
