//! Retrieval results and ingestion responses

use serde::{Deserialize, Serialize};

use super::metadata::{DocumentMetadata, QueryFilter};

/// One retrieved passage
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalHit {
    /// Raw document text
    pub document: String,
    /// Stored metadata
    pub metadata: DocumentMetadata,
    /// Distance reported by the store (lower is more similar)
    pub distance: f32,
}

/// Hits ordered by ascending distance
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievalResult {
    hits: Vec<RetrievalHit>,
}

impl RetrievalResult {
    /// Build from hits in any order; sorts by ascending distance (stable for ties)
    pub fn from_hits(mut hits: Vec<RetrievalHit>) -> Self {
        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Self { hits }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn hits(&self) -> &[RetrievalHit] {
        &self.hits
    }

    /// Keep only the `k` closest hits
    pub fn truncate(&mut self, k: usize) {
        self.hits.truncate(k);
    }

    pub fn iter(&self) -> impl Iterator<Item = &RetrievalHit> {
        self.hits.iter()
    }
}

/// Which retrieval strategy produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalPath {
    /// Metadata-filtered query returned at least one hit
    Filtered,
    /// Unfiltered similarity search
    Semantic,
}

/// Outcome of hybrid retrieval
#[derive(Debug, Clone, PartialEq)]
pub struct Retrieval {
    /// Path that produced `result`
    pub path: RetrievalPath,
    /// Filter produced by extraction (possibly empty)
    pub filter: QueryFilter,
    /// Retrieved hits
    pub result: RetrievalResult,
}

/// Response for `POST /ingest`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    /// "success" on completion
    pub status: String,
    /// Stored file name
    pub filename: String,
    /// Documents newly written to the store
    pub documents_added: usize,
}

impl IngestResponse {
    pub fn success(filename: impl Into<String>, documents_added: usize) -> Self {
        Self {
            status: "success".to_string(),
            filename: filename.into(),
            documents_added,
        }
    }
}

/// Summary of one ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Documents read from the source
    pub documents_loaded: usize,
    /// Documents written to the store
    pub documents_added: usize,
    /// Documents whose text matched the allocation pattern
    pub documents_structured: usize,
    /// True when the run wrote nothing because the store was already populated
    pub skipped: bool,
    /// Store size after the run
    pub store_count: usize,
}
