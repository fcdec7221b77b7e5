//! In-memory vector index
//!
//! Brute-force scoring over points held behind a `tokio::sync::RwLock`.
//! Used for offline runs and as the index fake in pipeline tests.

use std::collections::HashMap;

use async_trait::async_trait;
use docsearch_core::{
    CollectionSpec, DocSearchError, Distance, IndexedPoint, PointId, PointPayload, Result,
    ScoredPoint,
};
use tokio::sync::RwLock;

use crate::VectorIndex;

/// In-memory vector index owning one collection
#[derive(Debug)]
pub struct MemoryIndex {
    collection: CollectionSpec,
    /// `None` until the collection is ensured
    points: RwLock<Option<HashMap<PointId, (Vec<f32>, PointPayload)>>>,
}

impl MemoryIndex {
    pub fn new(collection: CollectionSpec) -> Self {
        Self {
            collection,
            points: RwLock::new(None),
        }
    }

    /// Number of stored points (0 if the collection does not exist)
    pub async fn len(&self) -> usize {
        self.points.read().await.as_ref().map_or(0, HashMap::len)
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Payload stored under an identifier
    pub async fn get(&self, id: PointId) -> Option<PointPayload> {
        self.points
            .read()
            .await
            .as_ref()
            .and_then(|points| points.get(&id))
            .map(|(_, payload)| payload.clone())
    }

    fn missing_collection(&self) -> DocSearchError {
        DocSearchError::IndexUnavailable(format!(
            "collection '{}' does not exist",
            self.collection.name
        ))
    }

    fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        match self.collection.distance {
            Distance::Cosine => cosine_similarity(a, b),
            Distance::Dot => a.iter().zip(b).map(|(x, y)| x * y).sum(),
        }
    }
}

/// Cosine similarity; 0.0 if either vector has zero magnitude
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    fn collection(&self) -> &CollectionSpec {
        &self.collection
    }

    async fn ensure_collection(&self) -> Result<()> {
        self.points.write().await.get_or_insert_with(HashMap::new);
        Ok(())
    }

    async fn upsert(&self, points: Vec<IndexedPoint>) -> Result<()> {
        let mut guard = self.points.write().await;
        let stored = guard.as_mut().ok_or_else(|| self.missing_collection())?;

        for point in points {
            self.collection.check_dimension(&point.vector)?;
            stored.insert(point.id, (point.vector, point.payload));
        }
        Ok(())
    }

    async fn search(&self, query_vector: &[f32], limit: usize) -> Result<Vec<ScoredPoint>> {
        let guard = self.points.read().await;
        let stored = guard.as_ref().ok_or_else(|| self.missing_collection())?;

        let mut hits: Vec<ScoredPoint> = stored
            .iter()
            .map(|(id, (vector, payload))| ScoredPoint {
                id: *id,
                score: self.score(vector, query_vector),
                payload: payload.clone(),
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        Ok(hits)
    }
}
