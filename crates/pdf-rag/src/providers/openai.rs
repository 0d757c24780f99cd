//! OpenAI-compatible providers for embeddings and chat completions

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::{EmbeddingConfig, LlmConfig};
use crate::error::{Error, PipelineStage, Result};
use crate::generation::PromptBuilder;
use crate::types::Chunk;

use super::embedding::EmbeddingProvider;
use super::llm::LlmProvider;

fn build_client(api_key: Option<&str>) -> Result<Client> {
    let api_key = api_key
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| Error::Config("missing OpenAI API key".to_string()))?;

    let mut headers = HeaderMap::new();
    let auth = format!("Bearer {}", api_key);
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&auth)
            .map_err(|_| Error::Config("invalid OpenAI API key".to_string()))?,
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    Client::builder()
        .default_headers(headers)
        .build()
        .map_err(|e| Error::Config(format!("failed to build OpenAI HTTP client: {}", e)))
}

async fn models_reachable(client: &Client, base_url: &str) -> bool {
    match client.get(format!("{}/models", base_url)).send().await {
        Ok(resp) => resp.status().is_success(),
        Err(e) => {
            tracing::debug!("OpenAI health check failed: {}", e);
            false
        }
    }
}

/// Embeddings client for OpenAI-compatible `/embeddings` endpoints
pub struct OpenAiEmbedder {
    client: Client,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbedder {
    /// Create a new embedder
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.api_key.as_deref())?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| Error::embedding("OpenAI returned no embedding"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };
        let resp = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::embedding(format!("OpenAI embeddings request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(Error::embedding(format!(
                "OpenAI embeddings returned {}: {}",
                status, body
            )));
        }

        let mut parsed: EmbeddingResponse = resp
            .json()
            .await
            .map_err(|e| Error::embedding(format!("failed to parse OpenAI embeddings: {}", e)))?;
        parsed.data.sort_by_key(|entry| entry.index);

        if parsed.data.len() != texts.len() {
            return Err(Error::embedding(format!(
                "OpenAI returned {} embeddings for {} inputs",
                parsed.data.len(),
                texts.len()
            )));
        }
        if let Some(entry) = parsed.data.iter().find(|e| e.embedding.len() != self.dimensions) {
            return Err(Error::dimension_mismatch(self.dimensions, entry.embedding.len())
                .at(PipelineStage::Embedding));
        }

        Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(models_reachable(&self.client, &self.base_url).await)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

/// Chat completions client for answer generation
pub struct OpenAiLlm {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OpenAiLlm {
    /// Create a new LLM provider
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.api_key.as_deref())?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.generate_model.clone(),
            temperature: config.temperature,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl LlmProvider for OpenAiLlm {
    async fn generate_answer(&self, question: &str, chunks: &[Chunk]) -> Result<String> {
        let context = PromptBuilder::build_context(chunks);
        let prompt = PromptBuilder::build_rag_prompt(question, &context);

        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: vec![ChatMessage {
                role: "user",
                content: &prompt,
            }],
        };
        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::llm(format!("failed to call OpenAI chat completions: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(Error::llm(format!("OpenAI returned {}: {}", status, text)));
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| Error::llm(format!("failed to parse OpenAI response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .map(|answer| answer.trim().to_string())
            .ok_or_else(|| Error::llm("OpenAI returned no answer"))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(models_reachable(&self.client, &self.base_url).await)
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
