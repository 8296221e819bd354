//! In-process vector store using cosine distance
//!
//! Entries are kept in insertion order behind a `tokio::sync::RwLock`. When a storage
//! path is set the collection is written to a JSON file after every mutation and
//! reloaded on open.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::providers::embedding::EmbeddingProvider;
use crate::providers::vector_store::{check_add_lengths, VectorStoreProvider};
use crate::types::{DocumentMetadata, QueryFilter, RetrievalHit, RetrievalResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    id: String,
    document: String,
    metadata: Map<String, Value>,
    embedding: Vec<f32>,
}

#[derive(Default)]
struct Collection {
    entries: Vec<StoredEntry>,
    positions: HashMap<String, usize>,
}

impl Collection {
    fn from_entries(entries: Vec<StoredEntry>) -> Self {
        let mut collection = Self::default();
        for entry in entries {
            collection.upsert(entry);
        }
        collection
    }

    fn upsert(&mut self, entry: StoredEntry) {
        match self.positions.get(&entry.id) {
            Some(&pos) => self.entries[pos] = entry,
            None => {
                self.positions.insert(entry.id.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }
}

/// Vector store held in memory, optionally persisted to a JSON file
pub struct InMemoryVectorStore {
    collection: RwLock<Collection>,
    storage_path: Option<PathBuf>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl InMemoryVectorStore {
    /// Create an empty, non-persistent store
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            collection: RwLock::new(Collection::default()),
            storage_path: None,
            embedder,
        }
    }

    /// Open a store persisted at `path`, loading any previously saved entries
    pub async fn open(
        path: impl Into<PathBuf>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let entries = Self::load_entries(&path).await;
        tracing::info!("Opened in-memory store at {} ({} entries)", path.display(), entries.len());

        Ok(Self {
            collection: RwLock::new(Collection::from_entries(entries)),
            storage_path: Some(path),
            embedder,
        })
    }

    /// Load entries from disk; unreadable files start an empty collection
    async fn load_entries(path: &Path) -> Vec<StoredEntry> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Vec::new();
        }

        match tokio::fs::read_to_string(path).await {
            Ok(content) => match serde_json::from_str::<Vec<StoredEntry>>(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}", path.display(), e);
                    Vec::new()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", path.display(), e);
                Vec::new()
            }
        }
    }

    /// Write the collection to disk. Callers hold the write guard so saves land in
    /// mutation order.
    async fn save_entries(&self, collection: &Collection) -> Result<()> {
        let Some(path) = &self.storage_path else {
            return Ok(());
        };
        let content = serde_json::to_vec(&collection.entries)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

/// Cosine similarity; 0.0 when either vector has zero magnitude
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStoreProvider for InMemoryVectorStore {
    async fn add(
        &self,
        documents: &[String],
        ids: &[String],
        metadatas: &[DocumentMetadata],
    ) -> Result<()> {
        check_add_lengths(documents, ids, metadatas)?;
        if documents.is_empty() {
            return Ok(());
        }

        let embeddings = self.embedder.embed_batch(documents).await?;

        let mut collection = self.collection.write().await;
        for (((id, document), metadata), embedding) in
            ids.iter().zip(documents).zip(metadatas).zip(embeddings)
        {
            collection.upsert(StoredEntry {
                id: id.clone(),
                document: document.clone(),
                metadata: metadata.to_store_map(),
                embedding,
            });
        }
        self.save_entries(&collection).await
    }

    async fn query(
        &self,
        text: &str,
        k: usize,
        filter: Option<&QueryFilter>,
    ) -> Result<RetrievalResult> {
        if k == 0 {
            return Ok(RetrievalResult::empty());
        }

        let embedding = self.embedder.embed(text).await?;
        let collection = self.collection.read().await;

        let hits = collection
            .entries
            .iter()
            .filter_map(|entry| {
                let metadata = DocumentMetadata::from_store_map(&entry.metadata, &entry.id);
                if let Some(filter) = filter {
                    if !filter.matches(&metadata) {
                        return None;
                    }
                }
                Some(RetrievalHit {
                    document: entry.document.clone(),
                    metadata,
                    distance: 1.0 - cosine_similarity(&entry.embedding, &embedding),
                })
            })
            .collect();

        let mut result = RetrievalResult::from_hits(hits);
        result.truncate(k);
        Ok(result)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.collection.read().await.entries.len())
    }

    async fn existing_ids(&self, ids: &[String]) -> Result<HashSet<String>> {
        let collection = self.collection.read().await;
        Ok(ids
            .iter()
            .filter(|id| collection.positions.contains_key(*id))
            .cloned()
            .collect())
    }

    async fn reset(&self) -> Result<()> {
        let mut collection = self.collection.write().await;
        *collection = Collection::default();
        self.save_entries(&collection).await
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::HashEmbedder;
    use crate::types::AllocationRecord;

    fn store() -> InMemoryVectorStore {
        InMemoryVectorStore::new(Arc::new(HashEmbedder::default()))
    }

    fn alloc(id: &str, entity: &str, period: &str, projects: &[&str]) -> DocumentMetadata {
        DocumentMetadata::with_structure(
            id,
            entity,
            period,
            projects
                .iter()
                .map(|p| AllocationRecord::new(*p, "50%"))
                .collect(),
        )
    }

    async fn seed(store: &InMemoryVectorStore) {
        let docs = vec![
            "Li at 2024-Q1 allocated 50% to Apollo, 50% to Orion".to_string(),
            "Wang at 2024-Q1 allocated 50% to Atlas, 50% to Apollo".to_string(),
            "Office moved to the third floor".to_string(),
        ];
        let ids = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let metas = vec![
            alloc("a", "Li", "2024-Q1", &["Apollo", "Orion"]),
            alloc("b", "Wang", "2024-Q1", &["Atlas", "Apollo"]),
            DocumentMetadata::new("c"),
        ];
        store.add(&docs, &ids, &metas).await.unwrap();
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_query_orders_by_distance() {
        let store = store();
        seed(&store).await;

        let result = store.query("office floor", 3, None).await.unwrap();
        assert_eq!(result.len(), 3);
        assert_eq!(result.hits()[0].metadata.doc_id(), "c");
        let distances: Vec<f32> = result.iter().map(|h| h.distance).collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_filter_applies_to_every_hit() {
        let store = store();
        seed(&store).await;

        let filter = QueryFilter::new(None, None, Some("Apollo".into()));
        let result = store.query("anything", 10, Some(&filter)).await.unwrap();
        let ids: HashSet<_> = result.iter().map(|h| h.metadata.doc_id().to_string()).collect();
        assert_eq!(ids, ["a", "b"].iter().map(|s| s.to_string()).collect());

        let filter = QueryFilter::new(Some("Li".into()), Some("2024-Q1".into()), None);
        let result = store.query("anything", 10, Some(&filter)).await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.hits()[0].metadata.entity(), Some("Li"));

        let filter = QueryFilter::new(Some("Nobody".into()), None, None);
        assert!(store.query("anything", 10, Some(&filter)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_k_limits_and_zero() {
        let store = store();
        seed(&store).await;
        assert_eq!(store.query("Apollo", 2, None).await.unwrap().len(), 2);
        assert!(store.query("Apollo", 0, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_existing_ids_and_upsert() {
        let store = store();
        seed(&store).await;

        let probe = vec!["a".to_string(), "zzz".to_string()];
        let existing = store.existing_ids(&probe).await.unwrap();
        assert_eq!(existing.len(), 1);
        assert!(existing.contains("a"));

        store
            .add(&["replaced".to_string()], &["a".to_string()], &[DocumentMetadata::new("a")])
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_mismatched_lengths_rejected() {
        let store = store();
        let result = store
            .add(&["one".to_string()], &[], &[DocumentMetadata::new("x")])
            .await;
        assert!(result.is_err());
        assert!(store.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store").join("collection.json");
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashEmbedder::default());

        {
            let store = InMemoryVectorStore::open(&path, Arc::clone(&embedder))
                .await
                .unwrap();
            seed(&store).await;
        }

        let reopened = InMemoryVectorStore::open(&path, Arc::clone(&embedder))
                .await
                .unwrap();
        assert_eq!(reopened.count().await.unwrap(), 3);
        let filter = QueryFilter::new(Some("Wang".into()), None, None);
        let result = reopened.query("Atlas", 5, Some(&filter)).await.unwrap();
        assert_eq!(result.hits()[0].metadata.primary_projects(), Some("Atlas, Apollo"));

        reopened.reset().await.unwrap();
        let again = InMemoryVectorStore::open(&path, embedder).await.unwrap();
        assert!(again.is_empty().await.unwrap());
    }
}
