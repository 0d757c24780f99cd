//! Fake providers and PDF fixtures shared by the integration tests

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Object, Stream};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use pdf_rag::providers::{EmbeddingProvider, LlmProvider};
use pdf_rag::{Chunk, Error};

pub const DIMENSIONS: usize = 64;

/// Bag-of-words hashing embedder
pub struct WordHashEmbedder {
    pub fail: AtomicBool,
}

#[async_trait]
impl EmbeddingProvider for WordHashEmbedder {
    async fn embed(&self, text: &str) -> pdf_rag::Result<Vec<f32>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::embedding("rate limited"));
        }
        let mut vector = vec![0.0; DIMENSIONS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
            for byte in word.to_lowercase().bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(0x0100_0000_01b3);
            }
            vector[(hash % DIMENSIONS as u64) as usize] += 1.0;
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }

    async fn health_check(&self) -> pdf_rag::Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "word-hash"
    }
}

/// Records the chunks it receives and refuses to answer without overlap
pub struct RecordingLlm {
    pub seen: Mutex<Vec<Vec<Chunk>>>,
}

#[async_trait]
impl LlmProvider for RecordingLlm {
    async fn generate_answer(&self, question: &str, chunks: &[Chunk]) -> pdf_rag::Result<String> {
        self.seen.lock().push(chunks.to_vec());
        let supported = question
            .split_whitespace()
            .filter(|w| w.len() > 3)
            .any(|w| {
                let w = w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
                chunks.iter().any(|c| c.content.to_lowercase().contains(&w))
            });
        if supported {
            Ok(chunks[0].content.clone())
        } else {
            Ok("I don't have enough information to answer that question.".to_string())
        }
    }

    async fn health_check(&self) -> pdf_rag::Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "recording"
    }

    fn model(&self) -> &str {
        "recording"
    }
}

/// One page per entry; an empty string produces a blank page
pub fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let operations = if text.is_empty() {
            Vec::new()
        } else {
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ]
        };
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}
