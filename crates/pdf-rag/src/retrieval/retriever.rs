//! Embeds a question and fetches its nearest chunks

use std::sync::Arc;

use crate::error::{PipelineStage, Result};
use crate::providers::{EmbeddingProvider, VectorStoreProvider};
use crate::types::Chunk;

/// Top-k retriever over the vector store
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
    top_k: usize,
}

impl Retriever {
    /// Create a retriever returning at most `top_k` chunks
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStoreProvider>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            top_k,
        }
    }

    /// Chunks in descending similarity to the query
    ///
    /// Scores are logged at debug level and then dropped.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<Chunk>> {
        let embedding = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| e.at(PipelineStage::Retrieval))?;

        let results = self
            .store
            .similarity_search(&embedding, self.top_k)
            .await
            .map_err(|e| e.at(PipelineStage::Retrieval))?;

        for (rank, result) in results.iter().enumerate() {
            tracing::debug!(
                "Retrieved #{} {} page {} chunk {} (similarity {:.4})",
                rank + 1,
                result.chunk.metadata.source,
                result.chunk.metadata.page,
                result.chunk.metadata.chunk_index,
                result.similarity
            );
        }

        Ok(results.into_iter().map(|r| r.chunk).collect())
    }
}
