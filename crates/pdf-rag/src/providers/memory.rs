//! In-process vector store with brute-force cosine search
//!
//! Contents are lost on restart. Used by tests and `VECTOR_STORE=memory`.

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{PipelineStage, Result};
use crate::types::{Fingerprint, StoredRecord};

use super::vector_store::{check_records, check_vector, VectorSearchResult, VectorStoreProvider};

/// Vector store keeping every record in insertion order
pub struct InMemoryVectorStore {
    records: RwLock<Vec<StoredRecord>>,
    dimensions: usize,
}

impl InMemoryVectorStore {
    /// Create an empty store for vectors of the given dimension
    pub fn new(dimensions: usize) -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            dimensions,
        }
    }
}

/// Cosine similarity, zero when either vector has no magnitude
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[async_trait]
impl VectorStoreProvider for InMemoryVectorStore {
    async fn add(&self, records: Vec<StoredRecord>) -> Result<usize> {
        check_records(&records, self.dimensions)?;
        let count = records.len();
        self.records.write().extend(records);
        Ok(count)
    }

    async fn contains_fingerprint(&self, fingerprint: &Fingerprint) -> Result<bool> {
        Ok(self
            .records
            .read()
            .iter()
            .any(|r| r.chunk.metadata.doc_hash == fingerprint.as_str()))
    }

    async fn similarity_search(
        &self,
        query_embedding: &[f32],
        k: usize,
    ) -> Result<Vec<VectorSearchResult>> {
        check_vector(query_embedding, self.dimensions)
            .map_err(|e| e.at(PipelineStage::Retrieval))?;

        let records = self.records.read();
        let mut scored: Vec<(f32, &StoredRecord)> = records
            .iter()
            .map(|r| (cosine_similarity(query_embedding, &r.embedding), r))
            .collect();

        // Stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(similarity, record)| VectorSearchResult {
                chunk: record.chunk.clone(),
                similarity,
            })
            .collect())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.records.read().len())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::{Chunk, ChunkMetadata};
    use uuid::Uuid;

    fn record(content: &str, doc_hash: &str, embedding: Vec<f32>) -> StoredRecord {
        StoredRecord {
            chunk: Chunk {
                id: Uuid::new_v4(),
                content: content.to_string(),
                metadata: ChunkMetadata {
                    source: "a.pdf".to_string(),
                    page: 1,
                    chunk_index: 0,
                    doc_hash: doc_hash.to_string(),
                    total_chunks: 1,
                },
            },
            embedding,
        }
    }

    #[tokio::test]
    async fn test_search_orders_by_similarity() {
        let store = InMemoryVectorStore::new(2);
        store
            .add(vec![
                record("far", "h", vec![0.0, 1.0]),
                record("near", "h", vec![1.0, 0.1]),
                record("exact", "h", vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let results = store.similarity_search(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.content, "exact");
        assert_eq!(results[1].chunk.content, "near");
        assert!(results[0].similarity >= results[1].similarity);
    }

    #[tokio::test]
    async fn test_ties_keep_insertion_order() {
        let store = InMemoryVectorStore::new(2);
        store
            .add(vec![
                record("first", "h", vec![2.0, 0.0]),
                record("second", "h", vec![1.0, 0.0]),
                record("third", "h", vec![3.0, 0.0]),
            ])
            .await
            .unwrap();

        let results = store.similarity_search(&[1.0, 0.0], 3).await.unwrap();
        let order: Vec<&str> = results.iter().map(|r| r.chunk.content.as_str()).collect();
        assert_eq!(order, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_add_rejects_wrong_dimension_atomically() {
        let store = InMemoryVectorStore::new(3);
        let err = store
            .add(vec![
                record("ok", "h", vec![1.0, 0.0, 0.0]),
                record("bad", "h", vec![1.0, 0.0]),
            ])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: 3,
                actual: 2,
                ..
            }
        ));
        assert!(store.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_contains_fingerprint() {
        let store = InMemoryVectorStore::new(1);
        let fingerprint = Fingerprint::of(b"doc");
        assert!(!store.contains_fingerprint(&fingerprint).await.unwrap());

        store
            .add(vec![record("x", fingerprint.as_str(), vec![1.0])])
            .await
            .unwrap();
        assert!(store.contains_fingerprint(&fingerprint).await.unwrap());
        assert!(!store
            .contains_fingerprint(&Fingerprint::of(b"other"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_non_finite_embeddings_are_rejected() {
        let store = InMemoryVectorStore::new(2);
        let err = store
            .add(vec![
                record("ok", "h", vec![1.0, 0.0]),
                record("nan", "h", vec![f32::NAN, 1.0]),
            ])
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Some(PipelineStage::Storing));
        assert!(store.is_empty().await.unwrap());

        let err = store
            .add(vec![record("inf", "h", vec![f32::INFINITY, 0.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UpstreamGeneration { .. }));

        let err = store
            .similarity_search(&[f32::NAN, 0.0], 3)
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Some(PipelineStage::Retrieval));
    }

    #[tokio::test]
    async fn test_search_over_many_records_with_equal_scores() {
        let store = InMemoryVectorStore::new(2);
        let records: Vec<StoredRecord> = (0..40)
            .map(|i| {
                let embedding = if i % 3 == 0 { vec![0.0, 1.0] } else { vec![1.0, 0.0] };
                record(&format!("r{}", i), "h", embedding)
            })
            .collect();
        store.add(records).await.unwrap();

        let results = store.similarity_search(&[1.0, 0.0], 3).await.unwrap();
        let order: Vec<&str> = results.iter().map(|r| r.chunk.content.as_str()).collect();
        assert_eq!(order, vec!["r1", "r2", "r4"]);
    }

    #[tokio::test]
    async fn test_query_dimension_is_checked() {
        let store = InMemoryVectorStore::new(3);
        let err = store.similarity_search(&[1.0], 3).await.unwrap_err();
        assert_eq!(err.stage(), Some(PipelineStage::Retrieval));
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
