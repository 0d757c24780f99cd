//! API routes for the RAG server

pub mod ingest;
pub mod query;

use axum::{extract::DefaultBodyLimit, routing::post, Router};
use crate::server::state::AppState;

/// Build the data-plane routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Ingestion - with larger body limit for file uploads
        .route(
            "/upload",
            post(ingest::upload_document).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/chat", post(query::chat))
}
