//! Hybrid retrieval: metadata-filtered lookup with semantic fallback

use std::sync::Arc;

use crate::error::Result;
use crate::providers::{LlmProvider, VectorStoreProvider};
use crate::types::{QueryFilter, Retrieval, RetrievalPath, RetrievalResult};

use super::extractor::MetadataExtractor;

/// Combines the metadata extractor with the vector store
pub struct HybridRetriever {
    extractor: MetadataExtractor,
    store: Arc<dyn VectorStoreProvider>,
}

impl HybridRetriever {
    pub fn new(llm: Arc<dyn LlmProvider>, store: Arc<dyn VectorStoreProvider>) -> Self {
        Self {
            extractor: MetadataExtractor::new(llm),
            store,
        }
    }

    /// Retrieve up to `k` passages for `query`.
    ///
    /// Extraction runs once. A non-empty filter is tried first; an empty filtered
    /// result falls back to unfiltered similarity search with the same `k`.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Retrieval> {
        let filter = self.extractor.extract(query).await;

        if let Some(result) = self.try_filtered(query, k, &filter).await? {
            tracing::info!("Filtered retrieval returned {} hits", result.len());
            return Ok(Retrieval {
                path: RetrievalPath::Filtered,
                filter,
                result,
            });
        }

        let result = self.semantic(query, k).await?;
        tracing::info!("Semantic retrieval returned {} hits", result.len());
        Ok(Retrieval {
            path: RetrievalPath::Semantic,
            filter,
            result,
        })
    }

    /// Filtered query; `None` when the filter is empty or matched nothing
    pub async fn try_filtered(
        &self,
        query: &str,
        k: usize,
        filter: &QueryFilter,
    ) -> Result<Option<RetrievalResult>> {
        if filter.is_empty() {
            return Ok(None);
        }

        let result = self.store.query(query, k, Some(filter)).await?;
        if result.is_empty() {
            tracing::debug!("Filter {:?} matched nothing, falling back", filter);
            return Ok(None);
        }
        Ok(Some(result))
    }

    /// Unfiltered similarity search
    pub async fn semantic(&self, query: &str, k: usize) -> Result<RetrievalResult> {
        self.store.query(query, k, None).await
    }
}
