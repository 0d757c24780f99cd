//! Text chunking with page and position tracking

use unicode_segmentation::UnicodeSegmentation;
use uuid::Uuid;

use crate::config::ChunkingConfig;
use crate::types::{Chunk, ChunkMetadata, Fingerprint, LogicalUnit};

/// A chunk cut from a page, before document-wide numbering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkDraft {
    /// Page the text came from
    pub page: u32,
    /// Source filename
    pub source: String,
    /// Trimmed chunk text
    pub text: String,
}

/// Text chunker with configurable size and overlap
///
/// Sizes are measured in characters. Each window is cut at the strongest
/// boundary available (paragraph, sentence, line, then word) and falls back
/// to a hard cut when none lies inside the window.
#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    /// Target chunk size in characters
    chunk_size: usize,
    /// Overlap between chunks
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
        }
    }

    /// Create a chunker from configuration
    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Chunk the pages of one document and tag every chunk with provenance
    pub fn chunk(&self, units: &[LogicalUnit], fingerprint: &Fingerprint) -> Vec<Chunk> {
        tag_chunks(self.split_units(units), fingerprint)
    }

    /// Split each page independently; windows never span two pages
    pub fn split_units(&self, units: &[LogicalUnit]) -> Vec<ChunkDraft> {
        let mut drafts = Vec::new();
        for unit in units {
            for text in self.split_text(&unit.text) {
                drafts.push(ChunkDraft {
                    page: unit.page,
                    source: unit.source.clone(),
                    text,
                });
            }
        }
        drafts
    }

    /// Split a single text into trimmed, non-empty windows
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let offsets = CharOffsets::new(text);
        let len = offsets.len();
        if len == 0 {
            return Vec::new();
        }

        let tiers = [
            offsets.after_matches(text, "\n\n"),
            offsets.sentence_starts(text),
            offsets.after_matches(text, "\n"),
            offsets.word_starts(text),
        ];
        let words = &tiers[3];

        let mut pieces = Vec::new();
        let mut start = 0usize;

        loop {
            let hard_end = (start + self.chunk_size).min(len);
            let end = if hard_end == len {
                len
            } else {
                tiers
                    .iter()
                    .find_map(|tier| last_in(tier, start + self.overlap, hard_end))
                    .unwrap_or(hard_end)
            };

            let piece = offsets.slice(text, start, end).trim();
            if !piece.is_empty() {
                pieces.push(piece.to_string());
            }

            if end == len {
                break;
            }

            // Start the next window on a word boundary inside the overlap
            let overlap_start = end - self.overlap;
            start = first_in(words, overlap_start, end).unwrap_or(overlap_start);
        }

        pieces
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::from_config(&ChunkingConfig::default())
    }
}

/// Assign document-wide positions once the full sequence is known
pub fn tag_chunks(drafts: Vec<ChunkDraft>, fingerprint: &Fingerprint) -> Vec<Chunk> {
    let total_chunks = drafts.len() as u32;
    drafts
        .into_iter()
        .enumerate()
        .map(|(index, draft)| Chunk {
            id: Uuid::new_v4(),
            content: draft.text,
            metadata: ChunkMetadata {
                source: draft.source,
                page: draft.page,
                chunk_index: index as u32,
                doc_hash: fingerprint.as_str().to_string(),
                total_chunks,
            },
        })
        .collect()
}

/// Largest boundary `b` with `lower < b <= upper`
fn last_in(boundaries: &[usize], lower: usize, upper: usize) -> Option<usize> {
    let idx = boundaries.partition_point(|&b| b <= upper);
    boundaries[..idx].last().copied().filter(|&b| b > lower)
}

/// Smallest boundary `b` with `lower <= b < upper`
fn first_in(boundaries: &[usize], lower: usize, upper: usize) -> Option<usize> {
    let idx = boundaries.partition_point(|&b| b < lower);
    boundaries.get(idx).copied().filter(|&b| b < upper)
}

/// Byte offset of every character, plus the end of the text
struct CharOffsets(Vec<usize>);

impl CharOffsets {
    fn new(text: &str) -> Self {
        let mut offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        offsets.push(text.len());
        Self(offsets)
    }

    /// Length in characters
    fn len(&self) -> usize {
        self.0.len() - 1
    }

    fn to_char(&self, byte: usize) -> usize {
        self.0.partition_point(|&b| b < byte)
    }

    fn slice<'a>(&self, text: &'a str, start: usize, end: usize) -> &'a str {
        &text[self.0[start]..self.0[end]]
    }

    fn after_matches(&self, text: &str, pattern: &str) -> Vec<usize> {
        text.match_indices(pattern)
            .map(|(i, m)| self.to_char(i + m.len()))
            .collect()
    }

    fn sentence_starts(&self, text: &str) -> Vec<usize> {
        text.split_sentence_bound_indices()
            .map(|(i, _)| self.to_char(i))
            .filter(|&c| c > 0)
            .collect()
    }

    fn word_starts(&self, text: &str) -> Vec<usize> {
        text.split_word_bound_indices()
            .map(|(i, _)| self.to_char(i))
            .filter(|&c| c > 0)
            .collect()
    }
}
