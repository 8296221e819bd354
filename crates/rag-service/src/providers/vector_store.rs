//! Vector store provider trait for storing and searching documents

use async_trait::async_trait;
use std::collections::HashSet;

use crate::error::Result;
use crate::types::{DocumentMetadata, QueryFilter, RetrievalResult};

/// Trait for the embedding/similarity-search engine
///
/// Implementations:
/// - `ChromaStore`: Chroma server over HTTP
/// - `InMemoryVectorStore`: in-process cosine store
///
/// Stores embed text themselves; callers only ever pass raw text.
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Add documents with their ids and metadata. All three slices must have equal length.
    async fn add(
        &self,
        documents: &[String],
        ids: &[String],
        metadatas: &[DocumentMetadata],
    ) -> Result<()>;

    /// Similarity query returning at most `k` hits ordered by ascending distance.
    ///
    /// With a non-empty filter every hit satisfies [`QueryFilter::matches`];
    /// `None` and an empty filter are unrestricted.
    async fn query(
        &self,
        text: &str,
        k: usize,
        filter: Option<&QueryFilter>,
    ) -> Result<RetrievalResult>;

    /// Number of stored documents
    async fn count(&self) -> Result<usize>;

    /// Subset of `ids` already present in the store
    async fn existing_ids(&self, ids: &[String]) -> Result<HashSet<String>>;

    /// Remove every document from the collection
    async fn reset(&self) -> Result<()>;

    /// Check if store is empty
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.count().await? == 0)
    }

    /// Check if the provider is healthy
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

/// Validate the parallel slices passed to [`VectorStoreProvider::add`]
pub(crate) fn check_add_lengths(
    documents: &[String],
    ids: &[String],
    metadatas: &[DocumentMetadata],
) -> Result<()> {
    if documents.len() != ids.len() || documents.len() != metadatas.len() {
        return Err(crate::error::Error::vector_db(format!(
            "add called with {} documents, {} ids and {} metadatas",
            documents.len(),
            ids.len(),
            metadatas.len()
        )));
    }
    Ok(())
}
