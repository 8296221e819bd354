//! API routes for the RAG server

pub mod ingest;
pub mod query;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Ingestion - with larger body limit for file uploads
        .route(
            "/ingest",
            post(ingest::ingest_file).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        // Streamed answers
        .route("/search", get(query::search))
        .route("/chat", post(query::chat))
        // Info
        .route("/info", get(info))
}

/// API info endpoint
async fn info() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "rag-service",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "RAG query service with structured allocation metadata and streamed answers",
        "endpoints": {
            "POST /api/v1/rag/ingest": "Upload a .txt, .md or .csv file (multipart field 'file')",
            "GET /api/v1/rag/search?query=": "Plain-text streamed answer",
            "POST /api/v1/rag/chat": "SSE streamed answer for {\"query\": ...}",
            "GET /api/v1/rag/info": "This document"
        },
        "features": {
            "structured_metadata": "Entity, period and project allocations parsed at ingest",
            "hybrid_retrieval": "Metadata-filtered lookup with semantic fallback",
            "streaming": "Answers streamed as they are generated"
        }
    }))
}
