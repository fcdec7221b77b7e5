//! docsearch Vector - Embeddings and vector index abstraction
//!
//! Provides the `Embedder` contract (text to fixed-length vector) and the
//! `VectorIndex` contract over one named collection, with Qdrant and
//! in-memory implementations.

use async_trait::async_trait;
use docsearch_core::{CollectionSpec, ConfigError, DocSearchError, IndexedPoint, Result, ScoredPoint};

pub mod embedding;
pub mod memory;
pub mod qdrant_store;

pub use embedding::{create_embedder, Embedder, HashingEmbedding, OllamaEmbedding, OpenAiEmbedding};
pub use memory::MemoryIndex;
pub use qdrant_store::QdrantIndex;

/// Trait for vector index operations on one collection
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// The collection this index owns
    fn collection(&self) -> &CollectionSpec;

    /// Create the collection if it does not exist; safe to call on every startup
    async fn ensure_collection(&self) -> Result<()>;

    /// Insert or replace points by identifier
    async fn upsert(&self, points: Vec<IndexedPoint>) -> Result<()>;

    /// Up to `limit` points, most similar first
    async fn search(&self, query_vector: &[f32], limit: usize) -> Result<Vec<ScoredPoint>>;
}

/// Reject an embedder whose vectors cannot be stored in `collection`
pub fn check_embedder(embedder: &dyn Embedder, collection: &CollectionSpec) -> Result<()> {
    if embedder.dimension() != collection.vector_size {
        return Err(DocSearchError::Config(ConfigError::InvalidValue {
            key: "vector.vector_dimension".to_string(),
            value: format!(
                "{} (collection '{}'), but the embedding model produces {}-dimensional vectors",
                collection.vector_size,
                collection.name,
                embedder.dimension()
            ),
        }));
    }
    Ok(())
}
