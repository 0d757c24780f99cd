//! Ingestion and query orchestration
//!
//! Ingest: fingerprint → existence check → extract → chunk → embed → store.
//! Query: retrieve top-k chunks → generate a grounded answer.

use std::sync::Arc;

use crate::config::{ChunkingConfig, RagConfig};
use crate::error::{Error, PipelineStage, Result};
use crate::generation::INSUFFICIENT_CONTEXT_ANSWER;
use crate::ingestion::{PdfExtractor, TextChunker};
use crate::providers::{EmbeddingProvider, LlmProvider, VectorStoreProvider};
use crate::retrieval::Retriever;
use crate::types::{Document, Fingerprint, IngestOutcome, StoredRecord};

/// Tunables for a pipeline instance
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    /// Chunk window and overlap
    pub chunking: ChunkingConfig,
    /// Chunks retrieved per query
    pub top_k: usize,
    /// Texts per embedding request
    pub batch_size: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            chunking: ChunkingConfig::default(),
            top_k: 3,
            batch_size: 64,
        }
    }
}

impl PipelineOptions {
    /// Options from the loaded configuration
    pub fn from_config(config: &RagConfig) -> Self {
        Self {
            chunking: config.chunking,
            top_k: config.retrieval.top_k,
            batch_size: config.embeddings.batch_size,
        }
    }
}

/// The RAG pipeline over injected providers
pub struct RagPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmProvider>,
    store: Arc<dyn VectorStoreProvider>,
    chunker: TextChunker,
    retriever: Retriever,
    batch_size: usize,
}

impl RagPipeline {
    /// Assemble a pipeline
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
        store: Arc<dyn VectorStoreProvider>,
        options: PipelineOptions,
    ) -> Self {
        let retriever = Retriever::new(Arc::clone(&embedder), Arc::clone(&store), options.top_k);
        Self {
            embedder,
            llm,
            store,
            chunker: TextChunker::from_config(&options.chunking),
            retriever,
            batch_size: options.batch_size.max(1),
        }
    }

    /// Vector store backing this pipeline
    pub fn store(&self) -> &Arc<dyn VectorStoreProvider> {
        &self.store
    }

    /// Ingest one PDF
    ///
    /// Returns [`IngestOutcome::Duplicate`] without touching the store when
    /// a document with the same bytes was stored before. Any stage failure
    /// aborts the ingestion with nothing written.
    pub async fn ingest(&self, document: Document) -> Result<IngestOutcome> {
        let fingerprint = document.fingerprint();
        tracing::info!(
            "Ingesting {} ({} bytes, fingerprint {})",
            document.filename,
            document.data.len(),
            fingerprint.short()
        );

        if self.already_stored(&fingerprint).await {
            tracing::info!(
                "{} already stored (fingerprint {}), skipping",
                document.filename,
                fingerprint.short()
            );
            return Ok(IngestOutcome::Duplicate { fingerprint });
        }

        let filename = document.filename.clone();
        let data = document.data.clone();
        let units =
            tokio::task::spawn_blocking(move || PdfExtractor::extract(&filename, &data)).await??;
        tracing::debug!("Extracted {} pages from {}", units.len(), document.filename);

        let chunks = self.chunker.chunk(&units, &fingerprint);
        if chunks.is_empty() {
            return Err(Error::EmptyDocument(document.filename));
        }
        tracing::debug!("Split {} into {} chunks", document.filename, chunks.len());

        let mut embeddings = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let mut vectors = self
                .embedder
                .embed_batch(&texts)
                .await
                .map_err(|e| e.at(PipelineStage::Embedding))?;
            if vectors.len() != texts.len() {
                return Err(Error::embedding(format!(
                    "{} returned {} embeddings for {} texts",
                    self.embedder.name(),
                    vectors.len(),
                    texts.len()
                )));
            }
            embeddings.append(&mut vectors);
        }

        let records: Vec<StoredRecord> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| StoredRecord { chunk, embedding })
            .collect();

        let chunk_count = self
            .store
            .add(records)
            .await
            .map_err(|e| e.at(PipelineStage::Storing))?;

        tracing::info!(
            "Stored {} chunks for {} in {}",
            chunk_count,
            document.filename,
            self.store.name()
        );
        Ok(IngestOutcome::Stored {
            fingerprint,
            chunk_count,
        })
    }

    /// Answer a question from the stored chunks
    pub async fn query(&self, question: &str) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::InvalidRequest("query must not be empty".to_string()));
        }
        tracing::info!("Processing query: {}", truncate(question, 100));

        let chunks = self.retriever.retrieve(question).await?;
        if chunks.is_empty() {
            tracing::info!("No stored chunks matched, answering without generation");
            return Ok(INSUFFICIENT_CONTEXT_ANSWER.to_string());
        }

        let answer = self
            .llm
            .generate_answer(question, &chunks)
            .await
            .map_err(|e| e.at(PipelineStage::Generation))?;

        tracing::info!(
            "Generated answer with {} from {} chunks",
            self.llm.model(),
            chunks.len()
        );
        Ok(answer)
    }

    /// Existence check that fails open: on store errors ingestion proceeds
    async fn already_stored(&self, fingerprint: &Fingerprint) -> bool {
        match self.store.contains_fingerprint(fingerprint).await {
            Ok(exists) => exists,
            Err(e) => {
                tracing::warn!(
                    "Existence check failed for {}, continuing with ingestion: {}",
                    fingerprint.short(),
                    e
                );
                false
            }
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::fixtures::pdf_with_pages;
    use crate::providers::testing::{FakeEmbedder, FakeLlm};
    use crate::providers::{InMemoryVectorStore, VectorSearchResult};
    use async_trait::async_trait;

    /// In-memory store whose existence check always errors
    struct FlakyExistenceStore(InMemoryVectorStore);

    #[async_trait]
    impl VectorStoreProvider for FlakyExistenceStore {
        async fn add(&self, records: Vec<StoredRecord>) -> Result<usize> {
            self.0.add(records).await
        }

        async fn contains_fingerprint(&self, _fingerprint: &Fingerprint) -> Result<bool> {
            Err(Error::store("connection reset").at(PipelineStage::ExistenceCheck))
        }

        async fn similarity_search(
            &self,
            query_embedding: &[f32],
            k: usize,
        ) -> Result<Vec<VectorSearchResult>> {
            self.0.similarity_search(query_embedding, k).await
        }

        async fn len(&self) -> Result<usize> {
            self.0.len().await
        }

        fn dimensions(&self) -> usize {
            self.0.dimensions()
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    fn pipeline_with(store: Arc<dyn VectorStoreProvider>) -> (RagPipeline, Arc<FakeLlm>) {
        let llm = Arc::new(FakeLlm::new());
        let pipeline = RagPipeline::new(
            Arc::new(FakeEmbedder::new()),
            llm.clone(),
            store,
            PipelineOptions::default(),
        );
        (pipeline, llm)
    }

    #[tokio::test]
    async fn test_empty_question_is_rejected() {
        let (pipeline, llm) = pipeline_with(Arc::new(InMemoryVectorStore::new(64)));
        let err = pipeline.query("   ").await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_store_answers_without_generation() {
        let (pipeline, llm) = pipeline_with(Arc::new(InMemoryVectorStore::new(64)));
        let answer = pipeline.query("What is the warranty period?").await.unwrap();
        assert_eq!(answer, INSUFFICIENT_CONTEXT_ANSWER);
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_existence_check_fails_open() {
        let store = Arc::new(FlakyExistenceStore(InMemoryVectorStore::new(64)));
        let (pipeline, _) = pipeline_with(store.clone());
        let pdf = pdf_with_pages(&["The warranty period is two years."]);

        let first = pipeline
            .ingest(Document::new("warranty.pdf", pdf.clone()))
            .await
            .unwrap();
        let second = pipeline
            .ingest(Document::new("warranty.pdf", pdf))
            .await
            .unwrap();

        assert!(matches!(first, IngestOutcome::Stored { chunk_count: 1, .. }));
        assert!(matches!(second, IngestOutcome::Stored { .. }));
        assert_eq!(store.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_small_batches_cover_every_chunk() {
        let store = Arc::new(InMemoryVectorStore::new(64));
        let embedder = Arc::new(FakeEmbedder::new());
        let pipeline = RagPipeline::new(
            embedder.clone(),
            Arc::new(FakeLlm::new()),
            store.clone(),
            PipelineOptions {
                chunking: ChunkingConfig {
                    chunk_size: 10,
                    chunk_overlap: 2,
                },
                top_k: 3,
                batch_size: 2,
            },
        );
        let pdf = pdf_with_pages(&["alpha beta gamma delta epsilon zeta eta theta"]);

        let outcome = pipeline.ingest(Document::new("greek.pdf", pdf)).await.unwrap();
        let stored = store.len().await.unwrap();

        assert_eq!(outcome.chunk_count(), stored);
        assert!(stored > 2);
        assert_eq!(embedder.calls(), stored);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("hi", 10), "hi");
    }
}
