//! PDF text extraction, one logical unit per page

use crate::error::{Error, Result};
use crate::types::LogicalUnit;

/// Replacements applied to raw page text before chunking
const TEXT_REPLACEMENTS: &[(char, &str)] = &[
    ('\0', ""),
    ('\u{00A0}', " "), // Non-breaking space
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
    ('\u{2010}', "-"),
    ('\u{2011}', "-"),
];

/// Clean up extracted page text
///
/// Drops NUL bytes, expands ligatures, and trims trailing whitespace on each
/// line while keeping line and paragraph breaks for the chunker.
fn cleanup_page_text(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match TEXT_REPLACEMENTS.iter().find(|(from, _)| *from == c) {
            Some((_, to)) => result.push_str(to),
            None => result.push(c),
        }
    }

    result
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// PDF extractor built on lopdf
pub struct PdfExtractor;

impl PdfExtractor {
    /// Extract the non-empty pages of a PDF in page order
    ///
    /// Fails with [`Error::Extraction`] when the bytes are not a readable PDF
    /// and with [`Error::EmptyDocument`] when the PDF loads but no page yields
    /// text.
    pub fn extract(filename: &str, data: &[u8]) -> Result<Vec<LogicalUnit>> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::extraction(filename, format!("Failed to load PDF: {}", e)))?;

        let pages = doc.get_pages();
        let mut units = Vec::with_capacity(pages.len());
        let mut failed_pages = 0usize;

        for page_number in pages.keys().copied() {
            let raw = match doc.extract_text(&[page_number]) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(
                        "Could not extract text from page {} of {}: {}",
                        page_number,
                        filename,
                        e
                    );
                    failed_pages += 1;
                    continue;
                }
            };

            let text = cleanup_page_text(&raw);
            if text.trim().is_empty() {
                tracing::debug!("Skipping blank page {} of {}", page_number, filename);
                continue;
            }

            units.push(LogicalUnit {
                page: page_number,
                source: filename.to_string(),
                text,
            });
        }

        if units.is_empty() {
            if doc.is_encrypted() && failed_pages > 0 && failed_pages == pages.len() {
                return Err(Error::extraction(filename, "PDF is encrypted and could not be read"));
            }
            return Err(Error::EmptyDocument(filename.to_string()));
        }

        tracing::debug!(
            "Extracted {} of {} pages from {}",
            units.len(),
            pages.len(),
            filename
        );

        Ok(units)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::pdf_with_pages;
    use super::*;

    #[test]
    fn test_extracts_pages_in_order() {
        let pdf = pdf_with_pages(&["First page text", "Second page text"]);
        let units = PdfExtractor::extract("two.pdf", &pdf).unwrap();

        assert_eq!(units.len(), 2);
        assert_eq!(units[0].page, 1);
        assert_eq!(units[1].page, 2);
        assert!(units[0].text.contains("First page text"));
        assert!(units[1].text.contains("Second page text"));
        assert!(units.iter().all(|u| u.source == "two.pdf"));
    }

    #[test]
    fn test_blank_pages_are_dropped() {
        let pdf = pdf_with_pages(&["", "Only real content", ""]);
        let units = PdfExtractor::extract("mixed.pdf", &pdf).unwrap();

        assert_eq!(units.len(), 1);
        assert_eq!(units[0].page, 2);
    }

    #[test]
    fn test_blank_document_is_empty_not_malformed() {
        let pdf = pdf_with_pages(&["", ""]);
        let err = PdfExtractor::extract("scan.pdf", &pdf).unwrap_err();
        assert!(matches!(err, Error::EmptyDocument(name) if name == "scan.pdf"));
    }

    #[test]
    fn test_garbage_bytes_are_extraction_errors() {
        let err = PdfExtractor::extract("notes.pdf", b"this is not a pdf").unwrap_err();
        assert!(matches!(err, Error::Extraction { filename, .. } if filename == "notes.pdf"));

        let err = PdfExtractor::extract("empty.pdf", b"").unwrap_err();
        assert!(matches!(err, Error::Extraction { .. }));
    }

    #[test]
    fn test_cleanup_page_text() {
        let cleaned = cleanup_page_text("e\u{FB03}cient\0 \n\nnext\u{00A0}line   \n");
        assert_eq!(cleaned, "efficient\n\nnext line");
    }
}
