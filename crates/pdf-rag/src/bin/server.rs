//! RAG Server binary
//!
//! Run with: cargo run -p pdf-rag --bin pdf-rag-server

use pdf_rag::{
    config::{RagConfig, ServerConfig},
    server::{state::AppState, RagServer},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; variables may come from the environment
    let dotenv = dotenvy::dotenv();

    let (server_config, server_config_error) = match ServerConfig::from_env() {
        Ok(config) => (config, None),
        Err(e) => (ServerConfig::default(), Some(e)),
    };

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("pdf_rag={},tower_http=info", server_config.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Ok(path) = dotenv {
        tracing::debug!("Loaded environment from {}", path.display());
    }
    if let Some(e) = server_config_error {
        tracing::warn!("Invalid server settings, using defaults: {}", e);
    }

    let state = match RagConfig::from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded");
            tracing::info!("  - Provider: {:?}", config.embeddings.provider);
            tracing::info!("  - Embedding model: {}", config.embeddings.model);
            tracing::info!("  - Embedding dimensions: {}", config.embeddings.dimensions);
            tracing::info!("  - LLM model: {}", config.llm.generate_model);
            tracing::info!(
                "  - Chunk size: {} (overlap {})",
                config.chunking.chunk_size,
                config.chunking.chunk_overlap
            );
            tracing::info!("  - Retrieval k: {}", config.retrieval.top_k);

            match AppState::new(config).await {
                Ok(state) => state,
                Err(e) => {
                    tracing::error!("Failed to initialize providers: {}", e);
                    AppState::not_configured(server_config, e.to_string())
                }
            }
        }
        Err(e) => {
            tracing::error!("Configuration incomplete, serving health checks only: {}", e);
            AppState::not_configured(server_config, e.to_string())
        }
    };

    let server = RagServer::new(state);
    tracing::info!("Health: http://{}/health", server.address());
    tracing::info!("Endpoints: POST /upload, POST /chat, GET /ready");

    server.start().await?;

    Ok(())
}
