//! Document upload endpoint

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{Document, IngestResponse};

/// Multipart field carrying the PDF
const FILE_FIELD: &str = "file";

/// POST /upload - Ingest one PDF
pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IngestResponse>> {
    let pipeline = state.pipeline()?;

    let mut upload: Option<(String, Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Failed to read multipart field", e))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "upload.pdf".to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error("Failed to read file", e))?;
        upload = Some((filename, data));
        break;
    }

    let (filename, data) = upload.ok_or_else(|| {
        Error::InvalidRequest(format!("missing multipart field '{}'", FILE_FIELD))
    })?;
    tracing::info!("Received upload: {} ({} bytes)", filename, data.len());

    let outcome = pipeline.ingest(Document::new(filename.clone(), data)).await?;
    Ok(Json(IngestResponse::new(filename, &outcome)))
}

/// Oversized bodies keep their 413; every other multipart failure is a bad request
fn multipart_error(context: &str, err: MultipartError) -> Error {
    let message = format!("{}: {}", context, err);
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::PayloadTooLarge(message)
    } else {
        Error::InvalidRequest(message)
    }
}
