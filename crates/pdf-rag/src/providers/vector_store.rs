//! Vector store provider trait for storing and searching embeddings

use async_trait::async_trait;
use crate::error::{Error, PipelineStage, Result};
use crate::types::{Chunk, Fingerprint, StoredRecord};

/// Search result from vector store
#[derive(Debug, Clone)]
pub struct VectorSearchResult {
    /// The matched chunk
    pub chunk: Chunk,
    /// Cosine similarity (higher is more similar)
    pub similarity: f32,
}

/// Trait for vector storage and similarity search
///
/// Implementations:
/// - `PgVectorStore`: Postgres with the pgvector extension
/// - `InMemoryVectorStore`: process-local brute-force store
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Persist records atomically: either all become visible or none do
    async fn add(&self, records: Vec<StoredRecord>) -> Result<usize>;

    /// Whether any record tagged with this fingerprint is stored
    async fn contains_fingerprint(&self, fingerprint: &Fingerprint) -> Result<bool>;

    /// Up to `k` chunks in descending similarity, ties in insertion order
    async fn similarity_search(
        &self,
        query_embedding: &[f32],
        k: usize,
    ) -> Result<Vec<VectorSearchResult>>;

    /// Get total number of vectors stored
    async fn len(&self) -> Result<usize>;

    /// Check if store is empty
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Vector dimension of the schema
    fn dimensions(&self) -> usize;

    /// Check if the provider is healthy
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

/// Reject records whose embedding length differs from the schema dimension
/// or that carry NaN or infinite components
pub fn check_records(records: &[StoredRecord], expected: usize) -> Result<()> {
    for record in records {
        check_vector(&record.embedding, expected)?;
    }
    Ok(())
}

/// Same checks for a single vector, e.g. a query embedding
pub fn check_vector(vector: &[f32], expected: usize) -> Result<()> {
    if vector.len() != expected {
        return Err(Error::dimension_mismatch(expected, vector.len()));
    }
    if vector.iter().any(|x| !x.is_finite()) {
        return Err(Error::embedding("embedding contains non-finite values")
            .at(PipelineStage::Storing));
    }
    Ok(())
}
