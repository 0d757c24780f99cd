//! Document ingestion: PDF extraction and chunking

mod chunker;
mod parser;

pub use chunker::{tag_chunks, ChunkDraft, TextChunker};
pub use parser::PdfExtractor;

#[cfg(test)]
pub(crate) use parser::fixtures;
