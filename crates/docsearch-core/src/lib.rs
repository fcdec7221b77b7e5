//! docsearch Core - Domain models, errors, and shared types
//!
//! This crate defines the types shared by every stage of the
//! document-to-vector pipeline:
//! - `Document`: one extracted, indexable unit of content
//! - `IndexedPoint` / `ScoredPoint`: what goes into and comes out of the index
//! - `SearchResult`: one ranked hit returned to the caller
//! - The error taxonomy and configuration

pub mod config;

pub use config::{
    AppConfig, ConfigError, EmbeddingConfig, EmbeddingProvider, LoggingConfig, PointIdPolicy,
    QueryConfig, SpeechConfig, VectorConfig,
};

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised by the indexing and query pipelines
#[derive(Error, Debug)]
pub enum DocSearchError {
    /// The source file is missing or cannot be opened
    #[error("Source unavailable: {path}: {source}")]
    SourceUnavailable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The file was opened but its content could not be extracted
    #[error("Extraction failed for {path}: {reason}")]
    ExtractionFailed { path: String, reason: String },

    /// No extractor is registered for the file extension
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The vector-search service could not serve the request
    #[error("Vector index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Embedding failed: {0}")]
    EmbeddingFailed(String),

    /// The embedder produced a vector that does not fit the collection
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DocSearchError {
    /// Build a `SourceUnavailable` error for a path
    pub fn source_unavailable(path: &Path, source: std::io::Error) -> Self {
        Self::SourceUnavailable {
            path: path.display().to_string(),
            source,
        }
    }

    /// Build an `ExtractionFailed` error for a path
    pub fn extraction_failed(path: &Path, reason: impl Into<String>) -> Self {
        Self::ExtractionFailed {
            path: path.display().to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DocSearchError>;

/// Arbitrary metadata attached to documents and stored with each point
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Metadata key holding the originating file name
pub const SOURCE_KEY: &str = "source";

// ============================================================================
// Document Models
// ============================================================================

/// One extracted unit of content
///
/// Documents are only created through [`Document::new`], which refuses
/// blank content, so every document an extractor emits carries text.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    content: String,
    metadata: Metadata,
    page_number: Option<u32>,
}

impl Document {
    /// Create a document for `source`; returns `None` when `content` is
    /// empty or whitespace-only
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Option<Self> {
        let content = content.into();
        if content.trim().is_empty() {
            return None;
        }

        let mut metadata = Metadata::new();
        metadata.insert(SOURCE_KEY.to_string(), serde_json::Value::String(source.into()));

        Some(Self {
            content,
            metadata,
            page_number: None,
        })
    }

    /// Set the 1-based page number
    pub fn with_page(mut self, page: u32) -> Self {
        self.page_number = Some(page);
        self
    }

    /// Add a metadata entry; the `source` entry cannot be replaced
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        let key = key.into();
        if key != SOURCE_KEY {
            self.metadata.insert(key, value.into());
        }
        self
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn page_number(&self) -> Option<u32> {
        self.page_number
    }

    /// Originating file name
    pub fn source(&self) -> &str {
        self.metadata
            .get(SOURCE_KEY)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
    }

    /// Split into the payload stored alongside the vector
    pub fn into_payload(self) -> PointPayload {
        PointPayload {
            content: self.content,
            metadata: self.metadata,
            page_number: self.page_number,
        }
    }
}

/// Base file name used as the `source` of extracted documents
pub fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ============================================================================
// Index Models
// ============================================================================

/// Identifier of a point in the vector index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointId {
    Num(u64),
    Uuid(Uuid),
}

impl std::fmt::Display for PointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{n}"),
            Self::Uuid(u) => write!(f, "{u}"),
        }
    }
}

impl From<u64> for PointId {
    fn from(n: u64) -> Self {
        Self::Num(n)
    }
}

impl From<Uuid> for PointId {
    fn from(u: Uuid) -> Self {
        Self::Uuid(u)
    }
}

/// Payload stored with each vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointPayload {
    pub content: String,
    pub metadata: Metadata,
    pub page_number: Option<u32>,
}

/// The stored unit: identifier, embedding and payload
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedPoint {
    pub id: PointId,
    pub vector: Vec<f32>,
    pub payload: PointPayload,
}

impl IndexedPoint {
    pub fn new(id: impl Into<PointId>, vector: Vec<f32>, payload: PointPayload) -> Self {
        Self {
            id: id.into(),
            vector,
            payload,
        }
    }
}

/// A raw hit returned by the vector index
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPoint {
    pub id: PointId,
    pub score: f32,
    pub payload: PointPayload,
}

/// Similarity metric of a collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distance {
    #[default]
    Cosine,
    Dot,
}

impl std::fmt::Display for Distance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cosine => write!(f, "cosine"),
            Self::Dot => write!(f, "dot"),
        }
    }
}

/// Name, dimensionality and metric of one collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSpec {
    pub name: String,
    pub vector_size: usize,
    pub distance: Distance,
}

impl CollectionSpec {
    /// Create a cosine collection spec
    pub fn new(name: impl Into<String>, vector_size: usize) -> Self {
        Self {
            name: name.into(),
            vector_size,
            distance: Distance::Cosine,
        }
    }

    /// Set the distance metric
    pub fn with_distance(mut self, distance: Distance) -> Self {
        self.distance = distance;
        self
    }

    /// Check that a vector fits this collection
    pub fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.vector_size {
            return Err(DocSearchError::DimensionMismatch {
                expected: self.vector_size,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Search Types
// ============================================================================

/// One ranked hit returned from a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Text of the matched document
    pub content: String,

    /// Similarity score (higher is more similar)
    pub score: f32,

    /// Metadata stored at index time
    pub metadata: Metadata,

    /// Page of the matched document, if paginated
    pub page_number: Option<u32>,
}

impl From<ScoredPoint> for SearchResult {
    fn from(point: ScoredPoint) -> Self {
        Self {
            content: point.payload.content,
            score: point.score,
            metadata: point.payload.metadata,
            page_number: point.payload.page_number,
        }
    }
}

impl SearchResult {
    /// Originating file name, if recorded
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(SOURCE_KEY).and_then(|v| v.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================
