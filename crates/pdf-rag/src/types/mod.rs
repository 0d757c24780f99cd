//! Core types for the RAG system

pub mod document;
pub mod query;
pub mod response;

pub use document::{Chunk, ChunkMetadata, Document, Fingerprint, LogicalUnit, StoredRecord};
pub use query::QueryRequest;
pub use response::{IngestOutcome, IngestResponse, IngestStatus, QueryResponse};
