//! Generative model provider trait

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;

/// Lazily produced answer text, one model chunk per item
pub type ChunkStream = BoxStream<'static, Result<String>>;

/// Trait for the external generative model
///
/// Implementations:
/// - `OllamaClient`: Local Ollama server
/// - `GeminiClient`: Gemini API
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Single-shot completion, used for structured extraction
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Streamed completion, used for answer generation.
    ///
    /// Errors before the first chunk are returned directly; later failures
    /// arrive as an `Err` item and end the stream.
    async fn generate_stream(&self, prompt: &str) -> Result<ChunkStream>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
