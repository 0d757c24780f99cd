//! Application state for the RAG server

use std::sync::Arc;

use crate::config::{ProviderKind, RagConfig, ServerConfig, VectorStoreKind};
use crate::error::{Error, Result};
use crate::pipeline::{PipelineOptions, RagPipeline};
use crate::providers::{
    EmbeddingProvider, InMemoryVectorStore, LlmProvider, OllamaProvider, OpenAiEmbedder,
    OpenAiLlm, PgVectorStore, VectorStoreProvider,
};

/// Whether the data plane is available
enum Readiness {
    /// Providers are connected
    Ready(Arc<RagPipeline>),
    /// Startup could not build the pipeline; only liveness is served
    NotConfigured(String),
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Transport settings
    server: ServerConfig,
    /// Pipeline or the reason it is missing
    readiness: Readiness,
}

impl AppState {
    /// Build providers from configuration and assemble the pipeline
    pub async fn new(config: RagConfig) -> Result<Self> {
        tracing::info!(
            "Initializing RAG application state (provider: {:?}, store: {:?})...",
            config.embeddings.provider,
            config.vector_db.store
        );

        let (embedder, llm): (Arc<dyn EmbeddingProvider>, Arc<dyn LlmProvider>) =
            match config.embeddings.provider {
                ProviderKind::OpenAi => (
                    Arc::new(OpenAiEmbedder::new(&config.embeddings)?),
                    Arc::new(OpenAiLlm::new(&config.llm)?),
                ),
                ProviderKind::Ollama => {
                    let (embedder, llm) =
                        OllamaProvider::new(&config.embeddings, &config.llm).split();
                    (Arc::new(embedder), Arc::new(llm))
                }
            };
        tracing::info!(
            "Embedding provider: {} ({}, {} dimensions)",
            embedder.name(),
            config.embeddings.model,
            embedder.dimensions()
        );
        tracing::info!("LLM provider: {} ({})", llm.name(), llm.model());

        let store: Arc<dyn VectorStoreProvider> = match config.vector_db.store {
            VectorStoreKind::PgVector => Arc::new(
                PgVectorStore::connect(&config.vector_db, config.embeddings.dimensions).await?,
            ),
            VectorStoreKind::Memory => {
                tracing::warn!("Using the in-memory vector store; data is lost on restart");
                Arc::new(InMemoryVectorStore::new(config.embeddings.dimensions))
            }
        };

        let pipeline = RagPipeline::new(embedder, llm, store, PipelineOptions::from_config(&config));
        Ok(Self::from_pipeline(config.server, Arc::new(pipeline)))
    }

    /// State around an already assembled pipeline
    pub fn from_pipeline(server: ServerConfig, pipeline: Arc<RagPipeline>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                server,
                readiness: Readiness::Ready(pipeline),
            }),
        }
    }

    /// Degraded state serving liveness only
    pub fn not_configured(server: ServerConfig, reason: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                server,
                readiness: Readiness::NotConfigured(reason.into()),
            }),
        }
    }

    /// The pipeline, or `NotConfigured` in degraded mode
    pub fn pipeline(&self) -> Result<&Arc<RagPipeline>> {
        match &self.inner.readiness {
            Readiness::Ready(pipeline) => Ok(pipeline),
            Readiness::NotConfigured(reason) => Err(Error::NotConfigured(reason.clone())),
        }
    }

    /// Whether the pipeline was built
    pub fn is_configured(&self) -> bool {
        matches!(self.inner.readiness, Readiness::Ready(_))
    }

    /// Transport settings
    pub fn server_config(&self) -> &ServerConfig {
        &self.inner.server
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_configured_state_reports_reason() {
        let state = AppState::not_configured(ServerConfig::default(), "DATABASE_URL is not set");

        assert!(!state.is_configured());
        let err = state.pipeline().err().unwrap();
        assert!(matches!(err, Error::NotConfigured(reason) if reason.contains("DATABASE_URL")));
    }

    #[tokio::test]
    async fn test_memory_store_with_ollama_builds_without_network() {
        let mut config = RagConfig::default();
        config.embeddings.provider = ProviderKind::Ollama;
        config.vector_db.store = VectorStoreKind::Memory;

        let state = AppState::new(config).await.unwrap();
        assert!(state.is_configured());
        assert_eq!(state.pipeline().unwrap().store().name(), "in-memory");
    }

    #[tokio::test]
    async fn test_openai_without_key_fails() {
        let mut config = RagConfig::default();
        config.vector_db.store = VectorStoreKind::Memory;

        assert!(matches!(AppState::new(config).await, Err(Error::Config(_))));
    }
}
