//! Error types for the RAG pipeline

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// Result type alias for RAG operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline stage an error originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    ExistenceCheck,
    Extraction,
    Chunking,
    Embedding,
    Storing,
    Retrieval,
    Generation,
    Startup,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ExistenceCheck => "existence check",
            Self::Extraction => "extraction",
            Self::Chunking => "chunking",
            Self::Embedding => "embedding",
            Self::Storing => "storing",
            Self::Retrieval => "retrieval",
            Self::Generation => "generation",
            Self::Startup => "startup",
        };
        f.write_str(name)
    }
}

/// RAG system errors
#[derive(Debug, Error)]
pub enum Error {
    /// The uploaded bytes are not a readable PDF
    #[error("Failed to extract '{filename}': {message}")]
    Extraction { filename: String, message: String },

    /// Valid PDF without any extractable text (e.g. scanned images)
    #[error("No text content could be extracted from '{0}'")]
    EmptyDocument(String),

    /// Caller supplied unusable input
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Request body exceeds the configured upload limit
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Vector length does not match the configured schema dimension
    #[error("Embedding dimension mismatch during {stage}: expected {expected}, got {actual}")]
    DimensionMismatch {
        stage: PipelineStage,
        expected: usize,
        actual: usize,
    },

    /// Datastore could not be reached or rejected the operation
    #[error("Vector store unavailable during {stage}: {message}")]
    StoreUnavailable {
        stage: PipelineStage,
        message: String,
    },

    /// Embedding or generation service failure
    #[error("Upstream service failed during {stage}: {message}")]
    UpstreamGeneration {
        stage: PipelineStage,
        message: String,
    },

    /// Server started without a usable configuration
    #[error("Service not configured: {0}")]
    NotConfigured(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an extraction error
    pub fn extraction(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extraction {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create an embedding service error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::UpstreamGeneration {
            stage: PipelineStage::Embedding,
            message: message.into(),
        }
    }

    /// Create a generation service error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::UpstreamGeneration {
            stage: PipelineStage::Generation,
            message: message.into(),
        }
    }

    /// Create a store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            stage: PipelineStage::Storing,
            message: message.into(),
        }
    }

    /// Create a dimension mismatch error
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            stage: PipelineStage::Storing,
            expected,
            actual,
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Re-annotate the stage of a staged error, leaving other variants as-is
    pub fn at(self, stage: PipelineStage) -> Self {
        match self {
            Self::DimensionMismatch {
                expected, actual, ..
            } => Self::DimensionMismatch {
                stage,
                expected,
                actual,
            },
            Self::StoreUnavailable { message, .. } => Self::StoreUnavailable { stage, message },
            Self::UpstreamGeneration { message, .. } => {
                Self::UpstreamGeneration { stage, message }
            }
            other => other,
        }
    }

    /// Stage annotation, if this variant carries one
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            Self::DimensionMismatch { stage, .. }
            | Self::StoreUnavailable { stage, .. }
            | Self::UpstreamGeneration { stage, .. } => Some(*stage),
            Self::Extraction { .. } | Self::EmptyDocument(_) => Some(PipelineStage::Extraction),
            _ => None,
        }
    }

    /// True for conditions the caller can fix by changing the request
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Extraction { .. }
                | Self::EmptyDocument(_)
                | Self::InvalidRequest(_)
                | Self::PayloadTooLarge(_)
        )
    }

    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Extraction { .. } => (StatusCode::BAD_REQUEST, "extraction_error"),
            Self::EmptyDocument(_) => (StatusCode::UNPROCESSABLE_ENTITY, "empty_document"),
            Self::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            Self::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
            Self::DimensionMismatch { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "dimension_mismatch")
            }
            Self::StoreUnavailable { .. } => (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable"),
            Self::UpstreamGeneration { .. } => (StatusCode::BAD_GATEWAY, "upstream_error"),
            Self::NotConfigured(_) => (StatusCode::SERVICE_UNAVAILABLE, "not_configured"),
            Self::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl From<r2d2::Error> for Error {
    fn from(err: r2d2::Error) -> Self {
        Error::store(format!("connection pool: {}", err))
    }
}

impl From<postgres::Error> for Error {
    fn from(err: postgres::Error) -> Self {
        Error::store(err.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Internal(format!("Task join error: {}", err))
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_kind();

        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::warn!("{}", self);
        }

        let body = Json(json!({
            "error": error_type,
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}
