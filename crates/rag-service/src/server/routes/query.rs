//! Streamed answer endpoints

use axum::{
    body::Body,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::Result;
use crate::generation::{FramedStream, StreamMode};
use crate::server::state::AppState;
use crate::types::{ChatRequest, SearchParams};

/// GET /api/v1/rag/search?query= - Plain-text streamed answer
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Response> {
    tracing::info!("Search: \"{}\"", params.query);

    let stream = state
        .answers()
        .answer(&params.query, params.top_k, StreamMode::Plain)
        .await?;

    Ok(streaming_response(stream, "text/plain; charset=utf-8"))
}

/// POST /api/v1/rag/chat - SSE streamed answer
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Response> {
    tracing::info!("Chat: \"{}\"", request.query);

    let stream = state
        .answers()
        .answer(&request.query, request.top_k, StreamMode::Sse)
        .await?;

    Ok(streaming_response(stream, "text/event-stream"))
}

fn streaming_response(stream: FramedStream, content_type: &'static str) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(stream),
    )
        .into_response()
}
