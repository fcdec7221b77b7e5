//! Qdrant implementation for vector storage
//!
//! Provides connection management and point operations for one
//! collection of document embeddings.

use std::collections::HashMap;

use async_trait::async_trait;
use docsearch_core::{
    CollectionSpec, DocSearchError, Distance, IndexedPoint, Metadata, PointId, PointPayload,
    Result, ScoredPoint, VectorConfig,
};
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance as QdrantDistance, PointStruct, SearchPointsBuilder,
    UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use tracing::debug;
use uuid::Uuid;

/// Qdrant vector index implementation
pub struct QdrantIndex {
    client: Qdrant,
    collection: CollectionSpec,
}

impl QdrantIndex {
    /// Create a new Qdrant connection
    pub fn new(config: &VectorConfig) -> Result<Self> {
        let client = Qdrant::from_url(&config.qdrant_url)
            .build()
            .map_err(|e| DocSearchError::IndexUnavailable(format!("Qdrant connection failed: {e}")))?;

        Ok(Self::from_client(client, config.collection_spec()))
    }

    /// Wrap an existing client
    pub fn from_client(client: Qdrant, collection: CollectionSpec) -> Self {
        Self { client, collection }
    }

    fn unavailable(&self, action: &str, e: impl std::fmt::Display) -> DocSearchError {
        DocSearchError::IndexUnavailable(format!(
            "Failed to {action} in collection '{}': {e}",
            self.collection.name
        ))
    }
}

fn qdrant_distance(distance: Distance) -> QdrantDistance {
    match distance {
        Distance::Cosine => QdrantDistance::Cosine,
        Distance::Dot => QdrantDistance::Dot,
    }
}

fn to_qdrant_id(id: PointId) -> qdrant_client::qdrant::PointId {
    match id {
        PointId::Num(n) => n.into(),
        PointId::Uuid(u) => u.to_string().into(),
    }
}

fn from_qdrant_id(id: Option<qdrant_client::qdrant::PointId>) -> Option<PointId> {
    match id?.point_id_options? {
        PointIdOptions::Num(n) => Some(PointId::Num(n)),
        PointIdOptions::Uuid(s) => Uuid::parse_str(&s).ok().map(PointId::Uuid),
    }
}

/// Payload written with each point: `content`, `metadata`, `page_number`
fn payload_to_qdrant(payload: PointPayload) -> HashMap<String, QdrantValue> {
    let mut map = serde_json::Map::new();
    map.insert(
        "content".to_string(),
        serde_json::Value::String(payload.content),
    );
    map.insert(
        "metadata".to_string(),
        serde_json::Value::Object(payload.metadata),
    );
    map.insert(
        "page_number".to_string(),
        serde_json::json!(payload.page_number),
    );

    map.into_iter().map(|(k, v)| (k, v.into())).collect()
}

fn qdrant_to_json(value: QdrantValue) -> serde_json::Value {
    match value.kind {
        Some(Kind::BoolValue(b)) => serde_json::Value::Bool(b),
        Some(Kind::IntegerValue(i)) => serde_json::Value::from(i),
        Some(Kind::DoubleValue(d)) => serde_json::Number::from_f64(d)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Some(Kind::StringValue(s)) => serde_json::Value::String(s),
        Some(Kind::ListValue(list)) => {
            serde_json::Value::Array(list.values.into_iter().map(qdrant_to_json).collect())
        }
        Some(Kind::StructValue(s)) => serde_json::Value::Object(
            s.fields
                .into_iter()
                .map(|(k, v)| (k, qdrant_to_json(v)))
                .collect(),
        ),
        Some(Kind::NullValue(_)) | None => serde_json::Value::Null,
    }
}

fn payload_from_qdrant(mut payload: HashMap<String, QdrantValue>) -> PointPayload {
    let content = payload
        .remove("content")
        .map(qdrant_to_json)
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();

    let metadata = match payload.remove("metadata").map(qdrant_to_json) {
        Some(serde_json::Value::Object(map)) => map,
        _ => Metadata::new(),
    };

    let page_number = payload
        .remove("page_number")
        .map(qdrant_to_json)
        .and_then(|v| v.as_u64())
        .and_then(|n| u32::try_from(n).ok());

    PointPayload {
        content,
        metadata,
        page_number,
    }
}

#[async_trait]
impl super::VectorIndex for QdrantIndex {
    fn collection(&self) -> &CollectionSpec {
        &self.collection
    }

    async fn ensure_collection(&self) -> Result<()> {
        // Check if collection exists
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| self.unavailable("list collections", e))?;

        let exists = collections
            .collections
            .iter()
            .any(|c| c.name == self.collection.name);

        if exists {
            debug!(collection = %self.collection.name, "Qdrant collection already exists");
            return Ok(());
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection.name).vectors_config(
                    VectorParamsBuilder::new(
                        self.collection.vector_size as u64,
                        qdrant_distance(self.collection.distance),
                    ),
                ),
            )
            .await
            .map_err(|e| self.unavailable("create collection", e))?;

        debug!(
            collection = %self.collection.name,
            size = self.collection.vector_size,
            distance = %self.collection.distance,
            "Created Qdrant collection"
        );
        Ok(())
    }

    async fn upsert(&self, points: Vec<IndexedPoint>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        let count = points.len();
        let points: Vec<PointStruct> = points
            .into_iter()
            .map(|point| {
                PointStruct::new(
                    to_qdrant_id(point.id),
                    point.vector,
                    payload_to_qdrant(point.payload),
                )
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection.name, points).wait(true))
            .await
            .map_err(|e| self.unavailable("upsert points", e))?;

        debug!(collection = %self.collection.name, count, "Upserted points to Qdrant");
        Ok(())
    }

    async fn search(&self, query_vector: &[f32], limit: usize) -> Result<Vec<ScoredPoint>> {
        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(
                    &self.collection.name,
                    query_vector.to_vec(),
                    limit as u64,
                )
                .with_payload(true),
            )
            .await
            .map_err(|e| self.unavailable("search points", e))?;

        let hits: Vec<ScoredPoint> = response
            .result
            .into_iter()
            .filter_map(|point| {
                Some(ScoredPoint {
                    id: from_qdrant_id(point.id)?,
                    score: point.score,
                    payload: payload_from_qdrant(point.payload),
                })
            })
            .collect();

        debug!(collection = %self.collection.name, hits = hits.len(), "Qdrant search finished");
        Ok(hits)
    }
}
