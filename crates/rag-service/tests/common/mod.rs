#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rag_service::providers::{ChunkStream, EmbeddingProvider, InMemoryVectorStore, LlmProvider};
use rag_service::{Error, Result};

/// Deterministic bag-of-words embedder
pub struct WordEmbedder;

#[async_trait]
impl EmbeddingProvider for WordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        const DIMS: usize = 128;
        let mut vector = vec![0.0; DIMS];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let bucket = token
                .to_lowercase()
                .bytes()
                .fold(17usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize))
                % DIMS;
            vector[bucket] += 1.0;
        }
        Ok(vector)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "words"
    }
}

/// Model double returning a fixed extraction and fixed answer chunks
pub struct FakeLlm {
    extraction: Option<String>,
    chunks: Vec<String>,
    complete_calls: AtomicUsize,
    stream_calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl FakeLlm {
    pub fn new(extraction: Option<&str>, chunks: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            extraction: extraction.map(str::to_string),
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            complete_calls: AtomicUsize::new(0),
            stream_calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn complete_calls(&self) -> usize {
        self.complete_calls.load(Ordering::SeqCst)
    }

    pub fn stream_calls(&self) -> usize {
        self.stream_calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().last().cloned()
    }
}

#[async_trait]
impl LlmProvider for FakeLlm {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        self.extraction
            .clone()
            .ok_or_else(|| Error::llm("extraction unavailable"))
    }

    async fn generate_stream(&self, prompt: &str) -> Result<ChunkStream> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.to_string());
        let chunks: Vec<Result<String>> = self.chunks.iter().cloned().map(Ok).collect();
        Ok(stream::iter(chunks).boxed())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "fake"
    }

    fn model(&self) -> &str {
        "fake-model"
    }
}

pub fn memory_store() -> Arc<InMemoryVectorStore> {
    Arc::new(InMemoryVectorStore::new(Arc::new(WordEmbedder)))
}
