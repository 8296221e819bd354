//! Text embedding seam used by the vector stores

use async_trait::async_trait;

use crate::error::Result;

/// Turns document and query text into vectors.
///
/// Stores own an embedder and call it on every `add` and `query`, so documents and
/// queries are always embedded by the same model.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// One vector per input, in input order. Falls back to one `embed` call per text.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    async fn health_check(&self) -> Result<bool>;

    fn name(&self) -> &str;
}
