//! Pipeline outcomes and HTTP response bodies

use serde::{Deserialize, Serialize};

use super::document::Fingerprint;

/// Result of a successful ingestion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Chunks were embedded and written
    Stored {
        fingerprint: Fingerprint,
        chunk_count: usize,
    },
    /// A document with the same fingerprint was already stored; nothing written
    Duplicate { fingerprint: Fingerprint },
}

impl IngestOutcome {
    /// Status tag
    pub fn status(&self) -> IngestStatus {
        match self {
            Self::Stored { .. } => IngestStatus::Stored,
            Self::Duplicate { .. } => IngestStatus::Duplicate,
        }
    }

    /// Chunks written by this call (zero for duplicates)
    pub fn chunk_count(&self) -> usize {
        match self {
            Self::Stored { chunk_count, .. } => *chunk_count,
            Self::Duplicate { .. } => 0,
        }
    }

    /// Document fingerprint
    pub fn fingerprint(&self) -> &Fingerprint {
        match self {
            Self::Stored { fingerprint, .. } | Self::Duplicate { fingerprint } => fingerprint,
        }
    }
}

/// Ingestion status tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestStatus {
    Stored,
    Duplicate,
}

/// Body returned by `POST /upload`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    /// "stored" or "duplicate"
    pub status: IngestStatus,
    /// Chunks written by this upload
    pub chunk_count: usize,
    /// Uploaded filename
    pub filename: String,
    /// Document fingerprint
    pub doc_hash: String,
    /// Human-readable summary
    pub message: String,
}

impl IngestResponse {
    /// Build the response for an outcome
    pub fn new(filename: impl Into<String>, outcome: &IngestOutcome) -> Self {
        let filename = filename.into();
        let message = match outcome {
            IngestOutcome::Stored { chunk_count, .. } => format!(
                "Document '{}' processed and stored successfully ({} chunks).",
                filename, chunk_count
            ),
            IngestOutcome::Duplicate { .. } => {
                format!("Document '{}' already processed and stored.", filename)
            }
        };

        Self {
            status: outcome.status(),
            chunk_count: outcome.chunk_count(),
            doc_hash: outcome.fingerprint().to_string(),
            filename,
            message,
        }
    }
}

/// Body returned by `POST /chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Generated answer
    pub answer: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_response_for_stored() {
        let outcome = IngestOutcome::Stored {
            fingerprint: Fingerprint::of(b"pdf"),
            chunk_count: 3,
        };
        let response = IngestResponse::new("guide.pdf", &outcome);

        assert_eq!(response.status, IngestStatus::Stored);
        assert_eq!(response.chunk_count, 3);
        assert!(response.message.contains("3 chunks"));

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "stored");
    }

    #[test]
    fn test_ingest_response_for_duplicate() {
        let outcome = IngestOutcome::Duplicate {
            fingerprint: Fingerprint::of(b"pdf"),
        };
        let response = IngestResponse::new("guide.pdf", &outcome);

        assert_eq!(response.chunk_count, 0);
        assert_eq!(
            serde_json::to_value(&response).unwrap()["status"],
            "duplicate"
        );
        assert_eq!(response.doc_hash, Fingerprint::of(b"pdf").as_str());
    }
}
