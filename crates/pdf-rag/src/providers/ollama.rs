//! Ollama-based providers for embeddings and LLM
//!
//! A single `OllamaClient` talks to the server; the embedder and the LLM
//! provider can share it.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{EmbeddingConfig, LlmConfig};
use crate::error::{Error, PipelineStage, Result};
use crate::generation::PromptBuilder;
use crate::types::Chunk;

use super::embedding::EmbeddingProvider;
use super::llm::LlmProvider;

/// Minimal HTTP client for the Ollama REST API
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaClient {
    /// Create a client for the given server URL
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Embed one text with the given model
    pub async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        let resp = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&EmbedRequest {
                model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| Error::embedding(format!("Ollama embeddings request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::embedding(format!(
                "Ollama embeddings returned {}: {}",
                status, body
            )));
        }

        let parsed: EmbedResponse = resp
            .json()
            .await
            .map_err(|e| Error::embedding(format!("failed to parse Ollama embedding: {}", e)))?;
        Ok(parsed.embedding)
    }

    /// Run a non-streaming completion
    pub async fn generate(&self, model: &str, prompt: &str, temperature: f32) -> Result<String> {
        let resp = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&GenerateRequest {
                model,
                prompt,
                stream: false,
                options: GenerateOptions { temperature },
            })
            .send()
            .await
            .map_err(|e| Error::llm(format!("Ollama generate request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::llm(format!("Ollama returned {}: {}", status, body)));
        }

        let parsed: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| Error::llm(format!("failed to parse Ollama response: {}", e)))?;
        Ok(parsed.response.trim().to_string())
    }

    /// Whether the server answers `/api/tags`
    pub async fn health_check(&self) -> Result<bool> {
        match self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
        {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(e) => {
                tracing::debug!("Ollama health check failed: {}", e);
                Ok(false)
            }
        }
    }
}

/// Ollama embedding provider using nomic-embed-text or similar models
pub struct OllamaEmbedder {
    client: Arc<OllamaClient>,
    dimensions: usize,
    model: String,
}

impl OllamaEmbedder {
    /// Create a new Ollama embedder
    pub fn new(config: &EmbeddingConfig) -> Self {
        Self::from_client(
            Arc::new(OllamaClient::new(&config.base_url)),
            config.dimensions,
            config.model.clone(),
        )
    }

    /// Create from existing OllamaClient
    pub fn from_client(client: Arc<OllamaClient>, dimensions: usize, model: String) -> Self {
        Self {
            client,
            dimensions,
            model,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embedding = self.client.embed(&self.model, text).await?;
        if embedding.len() != self.dimensions {
            return Err(Error::dimension_mismatch(self.dimensions, embedding.len())
                .at(PipelineStage::Embedding));
        }
        Ok(embedding)
    }

    // No native batch endpoint; the default sequential `embed_batch` applies

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

/// Ollama LLM provider for answer generation
pub struct OllamaLlm {
    client: Arc<OllamaClient>,
    model: String,
    temperature: f32,
}

impl OllamaLlm {
    /// Create a new Ollama LLM provider
    pub fn new(config: &LlmConfig) -> Self {
        Self::from_client(
            Arc::new(OllamaClient::new(&config.base_url)),
            config.generate_model.clone(),
            config.temperature,
        )
    }

    /// Create from existing OllamaClient
    pub fn from_client(client: Arc<OllamaClient>, model: String, temperature: f32) -> Self {
        Self {
            client,
            model,
            temperature,
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaLlm {
    async fn generate_answer(&self, question: &str, chunks: &[Chunk]) -> Result<String> {
        let context = PromptBuilder::build_context(chunks);
        let prompt = PromptBuilder::build_rag_prompt(question, &context);
        self.client
            .generate(&self.model, &prompt, self.temperature)
            .await
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Combined Ollama provider that shares a single client for both embeddings and LLM
pub struct OllamaProvider {
    embedder: OllamaEmbedder,
    llm: OllamaLlm,
}

impl OllamaProvider {
    /// Create a new combined Ollama provider
    pub fn new(embeddings: &EmbeddingConfig, llm: &LlmConfig) -> Self {
        let client = Arc::new(OllamaClient::new(&llm.base_url));
        Self {
            embedder: OllamaEmbedder::from_client(
                Arc::clone(&client),
                embeddings.dimensions,
                embeddings.model.clone(),
            ),
            llm: OllamaLlm::from_client(client, llm.generate_model.clone(), llm.temperature),
        }
    }

    /// Split into separate providers
    pub fn split(self) -> (OllamaEmbedder, OllamaLlm) {
        (self.embedder, self.llm)
    }
}
