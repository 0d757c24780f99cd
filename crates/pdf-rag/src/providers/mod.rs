//! Provider abstractions for embeddings, LLM, and vector storage
//!
//! Trait-based seams so the pipeline can run against OpenAI or a local
//! Ollama server, and against Postgres/pgvector or an in-process store.

pub mod embedding;
pub mod llm;
pub mod memory;
pub mod ollama;
pub mod openai;
pub mod pgvector;
pub mod vector_store;

pub use embedding::EmbeddingProvider;
pub use llm::LlmProvider;
pub use memory::InMemoryVectorStore;
pub use ollama::{OllamaEmbedder, OllamaLlm, OllamaProvider};
pub use openai::{OpenAiEmbedder, OpenAiLlm};
pub use pgvector::PgVectorStore;
pub use vector_store::{VectorSearchResult, VectorStoreProvider};

#[cfg(test)]
pub(crate) mod testing;
