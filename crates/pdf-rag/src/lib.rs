//! pdf-rag: PDF question answering over a pgvector store
//!
//! Uploaded PDFs are split into overlapping chunks, embedded, and stored with
//! their provenance. Questions are answered by retrieving the most similar
//! chunks and handing them to an LLM with a grounding prompt.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod pipeline;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, PipelineStage, Result};
pub use pipeline::{PipelineOptions, RagPipeline};
pub use types::{
    document::{Chunk, ChunkMetadata, Document, Fingerprint, LogicalUnit},
    query::QueryRequest,
    response::{IngestOutcome, IngestResponse, QueryResponse},
};
