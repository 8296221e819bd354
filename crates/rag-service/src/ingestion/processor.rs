//! Ingestion pipeline orchestration

use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::providers::VectorStoreProvider;
use crate::types::{Document, DocumentMetadata, FileType, IngestReport};

use super::allocation::AllocationParser;
use super::parser::FileParser;

/// Reads documents, attaches allocation metadata and writes them to the store
pub struct IngestPipeline {
    /// Allocation sentence parser
    parser: AllocationParser,
    /// Destination store
    store: Arc<dyn VectorStoreProvider>,
    /// Corpus root
    data_dir: PathBuf,
}

/// Parallel columns handed to [`VectorStoreProvider::add`]
#[derive(Default)]
struct Batch {
    documents: Vec<String>,
    ids: Vec<String>,
    metadatas: Vec<DocumentMetadata>,
    structured: usize,
}

impl Batch {
    fn len(&self) -> usize {
        self.ids.len()
    }
}

impl IngestPipeline {
    /// Create a new ingestion pipeline
    pub fn new(store: Arc<dyn VectorStoreProvider>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            parser: AllocationParser::new(),
            store,
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Derive stored metadata from a document's text
    pub fn metadata_for(&self, doc: &Document) -> DocumentMetadata {
        match self.parser.parse(&doc.text) {
            Some(parsed) => DocumentMetadata::with_structure(
                doc.id.clone(),
                parsed.entity,
                parsed.period,
                parsed.allocations,
            ),
            None => DocumentMetadata::new(doc.id.clone()),
        }
    }

    /// Read every supported file under the corpus root, sorted by path.
    ///
    /// Files that fail to parse are skipped with a warning; an unreadable directory
    /// aborts the load. Blocking; async callers go through [`Self::ingest_corpus`].
    pub fn load_corpus(&self) -> Result<Vec<Document>> {
        read_corpus(&self.data_dir)
    }

    /// Run the corpus walk on the blocking pool
    async fn load_corpus_blocking(&self) -> Result<Vec<Document>> {
        let data_dir = self.data_dir.clone();
        tokio::task::spawn_blocking(move || read_corpus(&data_dir))
            .await
            .map_err(|e| Error::Internal(format!("Corpus load task failed: {}", e)))?
    }

    /// Ingest the corpus directory unless the store already holds documents
    pub async fn ingest_corpus(&self) -> Result<IngestReport> {
        let existing = self.store.count().await?;
        if existing > 0 {
            tracing::info!(
                "Store {} already holds {} documents, skipping corpus ingestion",
                self.store.name(),
                existing
            );
            return Ok(IngestReport {
                skipped: true,
                store_count: existing,
                ..Default::default()
            });
        }

        let documents = self.load_corpus_blocking().await?;
        tracing::info!(
            "Loaded {} documents from {}",
            documents.len(),
            self.data_dir.display()
        );

        let loaded = documents.len();
        let batch = self.prepare(documents);
        self.write(loaded, batch).await
    }

    /// Save an uploaded file under the corpus root and ingest its new documents.
    ///
    /// Documents whose ids are already stored are skipped.
    pub async fn ingest_upload(&self, filename: &str, data: &[u8]) -> Result<IngestReport> {
        let parsed = FileParser::parse(filename, data)?;

        tokio::fs::create_dir_all(&self.data_dir).await?;
        tokio::fs::write(self.data_dir.join(filename), data).await?;
        tracing::info!(
            "Saved upload {} ({} bytes, {})",
            filename,
            data.len(),
            parsed.file_type.display_name()
        );

        let loaded = parsed.documents.len();
        let ids: Vec<String> = parsed.documents.iter().map(|d| d.id.clone()).collect();
        let existing = self.store.existing_ids(&ids).await?;
        if !existing.is_empty() {
            tracing::info!("{} documents from {} already stored", existing.len(), filename);
        }

        let fresh: Vec<Document> = parsed
            .documents
            .into_iter()
            .filter(|d| !existing.contains(&d.id))
            .collect();

        let batch = self.prepare(fresh);
        self.write(loaded, batch).await
    }

    /// Drop blank documents and attach metadata
    fn prepare(&self, documents: Vec<Document>) -> Batch {
        let mut batch = Batch::default();
        for doc in documents {
            if !doc.has_content() {
                continue;
            }
            let metadata = self.metadata_for(&doc);
            if metadata.is_structured() {
                batch.structured += 1;
            }
            batch.ids.push(doc.id);
            batch.documents.push(doc.text);
            batch.metadatas.push(metadata);
        }
        batch
    }

    async fn write(&self, loaded: usize, batch: Batch) -> Result<IngestReport> {
        let added = batch.len();
        if added > 0 {
            self.store
                .add(&batch.documents, &batch.ids, &batch.metadatas)
                .await?;
        }

        let store_count = self.store.count().await?;
        tracing::info!(
            "Added {} documents ({} structured); store now holds {}",
            added,
            batch.structured,
            store_count
        );

        Ok(IngestReport {
            documents_loaded: loaded,
            documents_added: added,
            documents_structured: batch.structured,
            skipped: false,
            store_count,
        })
    }
}

fn read_corpus(data_dir: &Path) -> Result<Vec<Document>> {
    if !data_dir.is_dir() {
        return Err(Error::ingestion(format!(
            "Data directory {} does not exist",
            data_dir.display()
        )));
    }

    let mut documents = Vec::new();
    for entry in WalkDir::new(data_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::ingestion(format!("Failed to walk corpus: {}", e)))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let source = relative_source(data_dir, path);
        if !FileType::from_path(path).is_supported() {
            tracing::debug!("Skipping unsupported file {}", source);
            continue;
        }

        let data = std::fs::read(path)?;
        match FileParser::parse(&source, &data) {
            Ok(parsed) => {
                tracing::debug!("Read {} records from {}", parsed.documents.len(), source);
                documents.extend(parsed.documents);
            }
            Err(e) => tracing::warn!("Skipping {}: {}", source, e),
        }
    }

    Ok(documents)
}

/// Path relative to the corpus root with `/` separators
fn relative_source(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
