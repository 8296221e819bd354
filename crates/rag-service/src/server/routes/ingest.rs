//! Document ingestion endpoint

use axum::{
    extract::{Multipart, State},
    Json,
};
use std::path::Path;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::IngestResponse;

/// POST /api/v1/rag/ingest - Upload one file (multipart field `file`) and ingest it
pub async fn ingest_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IngestResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::BadRequest(format!("Failed to read multipart field: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .and_then(safe_file_name)
            .ok_or_else(|| Error::BadRequest("Uploaded file has no usable name".to_string()))?;

        let data = field
            .bytes()
            .await
            .map_err(|e| Error::BadRequest(format!("Failed to read file: {}", e)))?;

        tracing::info!("Processing upload: {} ({} bytes)", filename, data.len());

        let report = state.pipeline().ingest_upload(&filename, &data).await?;
        return Ok(Json(IngestResponse::success(filename, report.documents_added)));
    }

    Err(Error::BadRequest("Missing multipart field 'file'".to_string()))
}

/// Reduce a client-supplied name to its final path component
fn safe_file_name(name: &str) -> Option<String> {
    let name = name.rsplit(['/', '\\']).next()?.trim();
    let name = Path::new(name).file_name()?.to_str()?;
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_file_name() {
        assert_eq!(safe_file_name("alloc.csv").as_deref(), Some("alloc.csv"));
        assert_eq!(safe_file_name("../../etc/notes.txt").as_deref(), Some("notes.txt"));
        assert_eq!(safe_file_name("C:\\docs\\q1.md").as_deref(), Some("q1.md"));
        assert_eq!(safe_file_name(""), None);
        assert_eq!(safe_file_name("dir/"), None);
        assert_eq!(safe_file_name(".."), None);
    }
}
