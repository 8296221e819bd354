//! Provider abstractions for embeddings, the generative model and vector storage
//!
//! Trait-based seams so the pipeline can run against Gemini or a local Ollama
//! server, and against Chroma or the in-process store.

pub mod chroma;
pub mod embedding;
pub mod gemini;
pub mod lines;
pub mod llm;
pub mod memory;
pub mod ollama;
pub mod vector_store;

pub use chroma::ChromaStore;
pub use embedding::EmbeddingProvider;
pub use gemini::GeminiClient;
pub use llm::{ChunkStream, LlmProvider};
pub use memory::InMemoryVectorStore;
pub use ollama::OllamaClient;
pub use vector_store::VectorStoreProvider;
