//! docsearch Pipeline - Indexing and query orchestration
//!
//! `IndexingPipeline` turns one source file into embedded points:
//! extract → embed → assign ids → upsert.
//! `QueryPipeline` embeds a question and returns the nearest documents.
//!
//! Both pipelines hold their collaborators behind trait objects so that
//! tests can run against `MemoryIndex` and `HashingEmbedding`.

use std::path::Path;
use std::sync::Arc;

use docsearch_core::{DocSearchError, IndexedPoint, PointIdPolicy, Result, SearchResult};
use docsearch_extract::ExtractorRegistry;
use docsearch_vector::{Embedder, VectorIndex};
use tracing::{debug, info};

pub mod ids;

pub use ids::assign_id;

/// Number of results returned when the caller does not ask for more
pub const DEFAULT_TOP_K: usize = 3;

// ============================================================================
// Indexing
// ============================================================================

/// Result of indexing one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    /// This many documents were written to the index
    Indexed(usize),
    /// The file produced no documents; nothing was written
    NoContent,
}

/// Extract → embed → upsert for single files
pub struct IndexingPipeline {
    registry: ExtractorRegistry,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    id_policy: PointIdPolicy,
}

impl IndexingPipeline {
    pub fn new(
        registry: ExtractorRegistry,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            registry,
            embedder,
            index,
            id_policy: PointIdPolicy::default(),
        }
    }

    /// Set how point identifiers are assigned
    pub fn with_id_policy(mut self, policy: PointIdPolicy) -> Self {
        self.id_policy = policy;
        self
    }

    /// Extract, embed and store every document of one file
    pub async fn index_file(&self, path: &Path) -> Result<IndexOutcome> {
        let extractor = self.registry.resolve_path(path)?;
        let documents = extractor.extract(path).await?;

        if documents.is_empty() {
            info!(path = %path.display(), extractor = extractor.name(), "No content extracted");
            return Ok(IndexOutcome::NoContent);
        }

        debug!(
            path = %path.display(),
            extractor = extractor.name(),
            documents = documents.len(),
            "Extracted documents"
        );

        let texts: Vec<String> = documents.iter().map(|d| d.content().to_string()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        if vectors.len() != texts.len() {
            return Err(DocSearchError::EmbeddingFailed(format!(
                "expected {} vectors for {}, got {}",
                texts.len(),
                path.display(),
                vectors.len()
            )));
        }

        let collection = self.index.collection();
        let points = documents
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(ordinal, (document, vector))| {
                collection.check_dimension(&vector)?;
                let id = assign_id(self.id_policy, ordinal, &document);
                Ok(IndexedPoint::new(id, vector, document.into_payload()))
            })
            .collect::<Result<Vec<_>>>()?;

        let count = points.len();
        self.index.upsert(points).await?;

        info!(
            path = %path.display(),
            collection = %collection.name,
            count,
            "Indexed documents"
        );
        Ok(IndexOutcome::Indexed(count))
    }
}

// ============================================================================
// Query
// ============================================================================

/// Embed a question and return the nearest stored documents
pub struct QueryPipeline {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl QueryPipeline {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    /// Up to `top_k` results, most similar first
    ///
    /// A blank query returns no results without touching the embedder
    /// or the index.
    pub async fn query(&self, text: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        if text.trim().is_empty() || top_k == 0 {
            debug!("Skipping blank query");
            return Ok(Vec::new());
        }

        let vector = self.embedder.embed(text).await?;
        self.index.collection().check_dimension(&vector)?;

        let hits = self.index.search(&vector, top_k).await?;
        debug!(hits = hits.len(), top_k, "Query finished");

        Ok(hits.into_iter().map(SearchResult::from).collect())
    }
}
