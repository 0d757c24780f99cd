//! LLM provider trait for generating answers

use async_trait::async_trait;
use crate::error::Result;
use crate::types::Chunk;

/// Trait for LLM-based answer generation
///
/// Implementations:
/// - `OpenAiLlm`: OpenAI-compatible chat completions (gpt-3.5-turbo, etc.)
/// - `OllamaLlm`: Local Ollama server (llama3, phi3, etc.)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Answer a question using only the supplied chunks as context
    async fn generate_answer(&self, question: &str, chunks: &[Chunk]) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
