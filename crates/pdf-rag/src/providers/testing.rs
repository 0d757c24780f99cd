//! Deterministic providers for unit tests

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{Chunk, ChunkMetadata, StoredRecord};

use super::embedding::EmbeddingProvider;
use super::llm::LlmProvider;

const DIMENSIONS: usize = 64;

/// Bag-of-words hashing embedder; identical words land in identical buckets
pub struct FakeEmbedder {
    fail: AtomicBool,
    calls: AtomicUsize,
}

impl FakeEmbedder {
    pub fn new() -> Self {
        Self {
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn fail_next_calls(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn bucket(word: &str) -> usize {
    // FNV-1a
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in word.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    (hash % DIMENSIONS as u64) as usize
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::embedding("embedding service unavailable"));
        }
        let mut vector = vec![0.0; DIMENSIONS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            vector[bucket(&word.to_lowercase())] += 1.0;
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Echoes the question and the chunks it was given
pub struct FakeLlm {
    calls: AtomicUsize,
}

impl FakeLlm {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for FakeLlm {
    async fn generate_answer(&self, question: &str, chunks: &[Chunk]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let context: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        Ok(format!("{} => {}", question, context.join(" | ")))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "fake"
    }

    fn model(&self) -> &str {
        "echo"
    }
}

/// A stored record with a fresh id and placeholder metadata
pub fn record(content: &str, embedding: Vec<f32>) -> StoredRecord {
    StoredRecord {
        chunk: Chunk {
            id: Uuid::new_v4(),
            content: content.to_string(),
            metadata: ChunkMetadata {
                source: "fixture.pdf".to_string(),
                page: 1,
                chunk_index: 0,
                doc_hash: "fixture".to_string(),
                total_chunks: 1,
            },
        },
        embedding,
    }
}
