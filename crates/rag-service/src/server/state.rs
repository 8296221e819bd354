//! Application state for the RAG server

use parking_lot::RwLock;
use std::sync::Arc;

use crate::config::{LlmBackend, RagConfig, VectorBackend};
use crate::error::Result;
use crate::generation::AnswerGenerator;
use crate::ingestion::IngestPipeline;
use crate::providers::{
    ChromaStore, EmbeddingProvider, GeminiClient, InMemoryVectorStore, LlmProvider, OllamaClient,
    VectorStoreProvider,
};
use crate::types::IngestReport;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// Generative model (extraction and answers)
    llm: Arc<dyn LlmProvider>,
    /// Vector store holding the corpus
    store: Arc<dyn VectorStoreProvider>,
    /// Corpus and upload ingestion
    pipeline: IngestPipeline,
    /// Per-query answer pipeline
    answers: AnswerGenerator,
    /// Set once startup ingestion has finished
    ready: RwLock<bool>,
}

impl AppState {
    /// Create state with the backends selected in `config`
    pub async fn new(config: RagConfig) -> Result<Self> {
        tracing::info!(
            "Initializing RAG application state (llm: {:?}, vector store: {:?})...",
            config.llm.provider,
            config.vector_db.backend
        );

        let (llm, embedder): (Arc<dyn LlmProvider>, Arc<dyn EmbeddingProvider>) =
            match config.llm.provider {
                LlmBackend::Gemini => {
                    let client = Arc::new(GeminiClient::new(&config.llm.gemini)?);
                    tracing::info!(
                        "Gemini client initialized (model: {}, embeddings: {})",
                        config.llm.gemini.model,
                        config.llm.gemini.embedding_model
                    );
                    (client.clone() as Arc<dyn LlmProvider>, client as Arc<dyn EmbeddingProvider>)
                }
                LlmBackend::Ollama => {
                    let client = Arc::new(OllamaClient::new(&config.llm.ollama)?);
                    tracing::info!(
                        "Ollama client initialized at {} (model: {}, embeddings: {})",
                        config.llm.ollama.base_url,
                        config.llm.ollama.generate_model,
                        config.llm.ollama.embed_model
                    );
                    (client.clone() as Arc<dyn LlmProvider>, client as Arc<dyn EmbeddingProvider>)
                }
            };

        let store: Arc<dyn VectorStoreProvider> = match config.vector_db.backend {
            VectorBackend::Chroma => Arc::new(ChromaStore::connect(&config.vector_db, embedder).await?),
            VectorBackend::Memory => match &config.vector_db.storage_path {
                Some(path) => Arc::new(InMemoryVectorStore::open(path, embedder).await?),
                None => Arc::new(InMemoryVectorStore::new(embedder)),
            },
        };
        tracing::info!("Vector store initialized ({})", store.name());

        Ok(Self::from_parts(config, llm, store))
    }

    /// Assemble state from already constructed collaborators
    pub fn from_parts(
        config: RagConfig,
        llm: Arc<dyn LlmProvider>,
        store: Arc<dyn VectorStoreProvider>,
    ) -> Self {
        let pipeline = IngestPipeline::new(Arc::clone(&store), config.ingestion.data_dir.clone());
        let answers = AnswerGenerator::new(Arc::clone(&llm), Arc::clone(&store), config.retrieval.top_k);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                llm,
                store,
                pipeline,
                answers,
                ready: RwLock::new(false),
            }),
        }
    }

    /// Reset the collection if configured, then ingest the corpus.
    ///
    /// Failures are logged and never abort startup. Marks the state ready afterwards.
    pub async fn run_startup_ingestion(&self) -> Option<IngestReport> {
        let config = &self.inner.config;

        if config.vector_db.reset_on_startup {
            match self.inner.store.reset().await {
                Ok(()) => tracing::info!("Vector store reset on startup"),
                Err(e) => tracing::error!("Failed to reset vector store: {}", e),
            }
        }

        let report = if config.ingestion.ingest_on_startup {
            match self.inner.pipeline.ingest_corpus().await {
                Ok(report) => {
                    tracing::info!(
                        "Startup ingestion finished: {} loaded, {} added, {} in store",
                        report.documents_loaded,
                        report.documents_added,
                        report.store_count
                    );
                    Some(report)
                }
                Err(e) => {
                    tracing::error!("Startup ingestion failed, serving existing store: {}", e);
                    None
                }
            }
        } else {
            None
        };

        self.set_ready(true);
        report
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Get the generative model
    pub fn llm(&self) -> &Arc<dyn LlmProvider> {
        &self.inner.llm
    }

    /// Get the vector store
    pub fn store(&self) -> &Arc<dyn VectorStoreProvider> {
        &self.inner.store
    }

    /// Get the ingestion pipeline
    pub fn pipeline(&self) -> &IngestPipeline {
        &self.inner.pipeline
    }

    /// Get the answer pipeline
    pub fn answers(&self) -> &AnswerGenerator {
        &self.inner.answers
    }

    /// Check if ready
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    /// Set ready state
    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready;
    }
}
