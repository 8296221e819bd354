//! Per-query answer pipeline

use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use crate::error::Result;
use crate::providers::{LlmProvider, VectorStoreProvider};
use crate::retrieval::HybridRetriever;

use super::prompt::PromptBuilder;
use super::stream::{self, FramedStream, StreamMode};

/// Retrieves context for a question and streams the model's answer
pub struct AnswerGenerator {
    retriever: HybridRetriever,
    llm: Arc<dyn LlmProvider>,
    top_k: usize,
}

impl AnswerGenerator {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        store: Arc<dyn VectorStoreProvider>,
        top_k: usize,
    ) -> Self {
        Self {
            retriever: HybridRetriever::new(Arc::clone(&llm), store),
            llm,
            top_k,
        }
    }

    pub fn retriever(&self) -> &HybridRetriever {
        &self.retriever
    }

    /// Answer `query` as a framed byte stream.
    ///
    /// A blank query yields an empty stream without calling the model. Failures
    /// before the first chunk are returned as `Err`.
    pub async fn answer(
        &self,
        query: &str,
        top_k: Option<usize>,
        mode: StreamMode,
    ) -> Result<FramedStream> {
        if query.trim().is_empty() {
            tracing::debug!("Empty query, returning empty stream");
            return Ok(stream::empty());
        }

        let k = top_k.unwrap_or(self.top_k).max(1);
        let span = tracing::info_span!("answer", request_id = %Uuid::new_v4());

        self.generate(query, k, mode).instrument(span).await
    }

    async fn generate(&self, query: &str, k: usize, mode: StreamMode) -> Result<FramedStream> {
        tracing::info!("Answering query with {} (k={})", self.llm.model(), k);

        let retrieval = self.retriever.retrieve(query, k).await?;
        let context = PromptBuilder::build_context(&retrieval);
        tracing::debug!("Context ({:?} path):\n{}", retrieval.path, context);

        let prompt = PromptBuilder::build_answer_prompt(&context, query);
        let chunks = self.llm.generate_stream(&prompt).await?;

        Ok(stream::frame(mode, chunks))
    }
}
