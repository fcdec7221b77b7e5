//! Property tests for in-memory index search ordering and limits.

use docsearch_core::{CollectionSpec, Document, IndexedPoint};
use docsearch_vector::{MemoryIndex, VectorIndex};
use proptest::prelude::*;

/// Generate a non-zero embedding of the given dimension.
fn arb_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter("non-zero embedding", |v| {
        v.iter().map(|x| x * x).sum::<f32>() > 1e-8
    })
}

fn indexed_point(id: u64, vector: Vec<f32>) -> IndexedPoint {
    let payload = Document::new(format!("point {id}"), "bulk.pdf")
        .unwrap()
        .with_page(id as u32 + 1)
        .into_payload();
    IndexedPoint::new(id, vector, payload)
}

mod prop_memory_search_ordering {
    use super::*;

    const DIM: usize = 8;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn results_ordered_descending_and_bounded_by_limit(
            vectors in proptest::collection::vec(arb_embedding(DIM), 1..40),
            query in arb_embedding(DIM),
            limit in 1usize..50,
        ) {
            let stored = vectors.len();
            let rt = tokio::runtime::Runtime::new().unwrap();
            let hits = rt.block_on(async {
                let index = MemoryIndex::new(CollectionSpec::new("prop", DIM));
                index.ensure_collection().await.unwrap();

                let points = vectors
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| indexed_point(i as u64, v))
                    .collect();
                index.upsert(points).await.unwrap();
                index.search(&query, limit).await.unwrap()
            });

            prop_assert!(hits.len() <= limit);
            prop_assert_eq!(hits.len(), limit.min(stored));

            for window in hits.windows(2) {
                prop_assert!(
                    window[0].score >= window[1].score,
                    "results not in descending order: {} < {}",
                    window[0].score,
                    window[1].score,
                );
            }
        }
    }
}

#[tokio::test]
async fn test_top_three_of_a_thousand_points() {
    const DIM: usize = 16;
    let index = MemoryIndex::new(CollectionSpec::new("bulk", DIM));
    index.ensure_collection().await.unwrap();

    // Deterministic spread of directions
    let points: Vec<IndexedPoint> = (0..1000u64)
        .map(|i| {
            let vector = (0..DIM)
                .map(|d| (((i * 31 + d as u64 * 17) % 97) as f32 / 48.5) - 1.0)
                .collect();
            indexed_point(i, vector)
        })
        .collect();
    index.upsert(points).await.unwrap();
    assert_eq!(index.len().await, 1000);

    let query: Vec<f32> = (0..DIM).map(|d| if d % 2 == 0 { 1.0 } else { -0.5 }).collect();
    let hits = index.search(&query, 3).await.unwrap();

    assert_eq!(hits.len(), 3);
    assert!(hits[0].score >= hits[1].score);
    assert!(hits[1].score >= hits[2].score);
}
