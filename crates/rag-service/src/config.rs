//! Configuration for the RAG service

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main RAG service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RagConfig {
    /// Deployment environment ("dev", "prod", ...)
    pub env: String,
    /// Server configuration
    pub server: ServerConfig,
    /// Generative model configuration
    pub llm: LlmConfig,
    /// Vector store configuration
    pub vector_db: VectorDbConfig,
    /// Corpus ingestion configuration
    pub ingestion: IngestionConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
}

impl RagConfig {
    /// Load configuration from an optional TOML file, then apply environment overrides.
    ///
    /// A missing file is not an error; defaults are used instead.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let raw = std::fs::read_to_string(path)?;
                let parsed: RagConfig = toml::from_str(&raw).map_err(|e| {
                    Error::Config(format!("Invalid config file {}: {}", path.display(), e))
                })?;
                tracing::info!("Loaded configuration from {}", path.display());
                parsed
            }
            Some(path) => {
                tracing::debug!("Config file {} not found, using defaults", path.display());
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in production)
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("RAG_ENV") {
            self.env = v;
        }
        if let Some(v) = lookup("GEMINI_API_KEY") {
            self.llm.gemini.api_key = v;
        }
        if let Some(v) = lookup("GEMINI_MODEL") {
            self.llm.gemini.model = v;
        }
        if let Some(v) = lookup("RAG_LLM_PROVIDER") {
            self.llm.provider = match v.to_lowercase().as_str() {
                "gemini" => LlmBackend::Gemini,
                "ollama" => LlmBackend::Ollama,
                other => return Err(Error::Config(format!("Unknown LLM provider: {}", other))),
            };
        }
        if let Some(v) = lookup("RAG_HOST") {
            self.server.host = v;
        }
        if let Some(v) = lookup("RAG_PORT") {
            self.server.port = v
                .parse()
                .map_err(|_| Error::Config(format!("Invalid RAG_PORT: {}", v)))?;
        }
        if let Some(v) = lookup("RAG_DATA_DIR") {
            self.ingestion.data_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("RAG_CHROMA_URL") {
            self.vector_db.chroma_url = v;
        }
        if let Some(v) = lookup("RAG_VECTOR_BACKEND") {
            self.vector_db.backend = match v.to_lowercase().as_str() {
                "chroma" => VectorBackend::Chroma,
                "memory" => VectorBackend::Memory,
                other => {
                    return Err(Error::Config(format!("Unknown vector backend: {}", other)))
                }
            };
        }
        Ok(())
    }

    /// Check that the selected backends have what they need
    pub fn validate(&self) -> Result<()> {
        if self.llm.provider == LlmBackend::Gemini && self.llm.gemini.api_key.trim().is_empty() {
            return Err(Error::Config(
                "Gemini provider selected but GEMINI_API_KEY is not set".to_string(),
            ));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::Config("retrieval.top_k must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Whether this is a development deployment
    pub fn is_dev(&self) -> bool {
        self.env == "dev"
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 100MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            enable_cors: true,
            max_upload_size: 100 * 1024 * 1024, // 100MB
        }
    }
}

/// Which generative model backend to use
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    /// Google Gemini REST API
    #[default]
    Gemini,
    /// Local Ollama server
    Ollama,
}

/// Generative model configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LlmConfig {
    /// Selected backend
    pub provider: LlmBackend,
    /// Gemini settings
    pub gemini: GeminiConfig,
    /// Ollama settings
    pub ollama: OllamaConfig,
}

/// Gemini API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// API key (usually supplied through GEMINI_API_KEY)
    pub api_key: String,
    /// API base URL
    pub base_url: String,
    /// Generation model
    pub model: String,
    /// Embedding model
    pub embedding_model: String,
    /// Temperature for generation
    pub temperature: f32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.5-flash-preview-05-20".to_string(),
            embedding_model: "embedding-001".to_string(),
            temperature: 0.2,
        }
    }
}

/// Ollama configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Generation model name
    pub generate_model: String,
    /// Embedding model name
    pub embed_model: String,
    /// Temperature for generation
    pub temperature: f32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            generate_model: "llama3.2:3b".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            temperature: 0.3,
        }
    }
}

/// Which vector store backend to use
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    /// Chroma server over HTTP
    #[default]
    Chroma,
    /// In-process store, optionally persisted as JSON
    Memory,
}

/// Vector store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorDbConfig {
    /// Selected backend
    pub backend: VectorBackend,
    /// Chroma server URL
    pub chroma_url: String,
    /// Collection name
    pub collection: String,
    /// Persistence file for the in-memory backend (None keeps it purely in memory)
    pub storage_path: Option<PathBuf>,
    /// Drop and recreate the collection before startup ingestion
    pub reset_on_startup: bool,
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        let storage_path = dirs::data_local_dir()
            .map(|dir| dir.join("rag-service").join("collection.json"));

        Self {
            backend: VectorBackend::Chroma,
            chroma_url: "http://localhost:8001".to_string(),
            collection: "rag_documents".to_string(),
            storage_path,
            reset_on_startup: false,
        }
    }
}

/// Corpus ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Directory holding the raw corpus (and uploaded files)
    pub data_dir: PathBuf,
    /// Run the ingestion pipeline when the server starts
    pub ingest_on_startup: bool,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            ingest_on_startup: true,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of passages retrieved per query
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = RagConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.vector_db.collection, "rag_documents");
        assert_eq!(config.llm.provider, LlmBackend::Gemini);
    }

    #[test]
    fn test_partial_toml() {
        let raw = r#"
            env = "prod"

            [server]
            port = 9000

            [vector_db]
            backend = "memory"
        "#;
        let config: RagConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.env, "prod");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.vector_db.backend, VectorBackend::Memory);
        assert_eq!(config.ingestion.data_dir, PathBuf::from("./data"));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("GEMINI_API_KEY", "secret"),
            ("RAG_PORT", "8123"),
            ("RAG_LLM_PROVIDER", "ollama"),
            ("RAG_DATA_DIR", "/srv/corpus"),
        ]
        .into_iter()
        .collect();

        let mut config = RagConfig::default();
        config
            .apply_env(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.llm.gemini.api_key, "secret");
        assert_eq!(config.server.port, 8123);
        assert_eq!(config.llm.provider, LlmBackend::Ollama);
        assert_eq!(config.ingestion.data_dir, PathBuf::from("/srv/corpus"));
    }

    #[test]
    fn test_invalid_port_rejected() {
        let mut config = RagConfig::default();
        let result = config.apply_env(|key| (key == "RAG_PORT").then(|| "not-a-port".to_string()));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_requires_gemini_key() {
        let config = RagConfig::default();
        assert!(config.validate().is_err());

        let mut config = RagConfig::default();
        config.llm.gemini.api_key = "key".to_string();
        assert!(config.validate().is_ok());

        let mut config = RagConfig::default();
        config.llm.provider = LlmBackend::Ollama;
        assert!(config.validate().is_ok());
    }
}
