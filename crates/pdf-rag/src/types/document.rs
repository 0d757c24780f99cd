//! Document, page and chunk types with provenance metadata

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

/// An uploaded document, consumed by ingestion and never persisted whole
#[derive(Debug, Clone)]
pub struct Document {
    /// Original filename as uploaded by user
    pub filename: String,
    /// Raw file bytes
    pub data: Bytes,
}

impl Document {
    /// Create a new document
    pub fn new(filename: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            data: data.into(),
        }
    }

    /// Content fingerprint of the raw bytes
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.data)
    }
}

/// Lowercase hex SHA-256 digest of a document's raw bytes
///
/// Depends only on content, never on the filename, and serves as the
/// idempotency key for ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Hash raw bytes
    pub fn of(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hex::encode(hasher.finalize()))
    }

    /// Full hex digest
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 16 hex characters, for log lines
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(16)]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Text of a single PDF page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalUnit {
    /// Page number (1-indexed)
    pub page: u32,
    /// Source filename
    pub source: String,
    /// Extracted text
    pub text: String,
}

/// Metadata persisted with every stored chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Original filename
    pub source: String,
    /// Page the chunk was cut from (1-indexed)
    pub page: u32,
    /// Zero-based position of the chunk within its document
    pub chunk_index: u32,
    /// Fingerprint of the source document
    pub doc_hash: String,
    /// Number of chunks the document produced
    pub total_chunks: u32,
}

/// A bounded window of document text ready for embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk ID
    pub id: Uuid,
    /// Text content
    pub content: String,
    /// Provenance metadata
    pub metadata: ChunkMetadata,
}

/// A chunk together with its embedding, as written to the vector store
#[derive(Debug, Clone)]
pub struct StoredRecord {
    /// The chunk
    pub chunk: Chunk,
    /// Embedding vector
    pub embedding: Vec<f32>,
}
