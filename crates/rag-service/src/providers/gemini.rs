//! Gemini client for extraction, streamed answers and embeddings
//!
//! Talks to the Generative Language REST API with an API key.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::GeminiConfig;
use crate::error::{Error, Result};
use crate::providers::embedding::EmbeddingProvider;
use crate::providers::lines::lines;
use crate::providers::llm::{ChunkStream, LlmProvider};

/// Request limit of `batchEmbedContents`
const MAX_BATCH_EMBED: usize = 100;

/// Gemini REST client
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(Error::Config("Gemini API key is empty".to_string()));
        }

        let client = Client::builder()
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!(
            "{}/v1beta/models/{}:{}",
            self.config.base_url.trim_end_matches('/'),
            model,
            method
        )
    }

    fn request(&self, prompt: &str) -> GenerateRequest {
        GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
            },
        }
    }

    async fn post<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Llm(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Llm(format!("Gemini request failed ({}): {}", status, body)));
        }

        Ok(response)
    }

    fn embedding_model_path(&self) -> String {
        format!("models/{}", self.config.embedding_model)
    }

    fn embed_request(&self, text: &str) -> EmbedRequest {
        EmbedRequest {
            model: self.embedding_model_path(),
            content: Content {
                role: None,
                parts: vec![Part {
                    text: text.to_string(),
                }],
            },
        }
    }

    /// `batchEmbedContents` bodies, at most [`MAX_BATCH_EMBED`] texts each
    fn batch_requests(&self, texts: &[String]) -> Vec<BatchEmbedRequest> {
        texts
            .chunks(MAX_BATCH_EMBED)
            .map(|chunk| BatchEmbedRequest {
                requests: chunk.iter().map(|text| self.embed_request(text)).collect(),
            })
            .collect()
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize, Default)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Default)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize, Default)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate
    fn text(&self) -> String {
        self.candidates
            .first()
            .map(|c| c.content.parts.iter().map(|p| p.text.as_str()).collect())
            .unwrap_or_default()
    }
}

#[derive(Serialize)]
struct EmbedRequest {
    model: String,
    content: Content,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedRequest>,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

/// Decode one `data:` line of a `streamGenerateContent?alt=sse` response.
///
/// Returns `None` for non-data lines and for chunks without text.
fn decode_sse_line(line: &str) -> Option<Result<String>> {
    let payload = line.strip_prefix("data:")?.trim();
    if payload.is_empty() {
        return None;
    }
    match serde_json::from_str::<GenerateResponse>(payload) {
        Ok(resp) => {
            let text = resp.text();
            (!text.is_empty()).then_some(Ok(text))
        }
        Err(e) => Some(Err(Error::Llm(format!("Failed to parse Gemini stream chunk: {}", e)))),
    }
}

#[async_trait]
impl LlmProvider for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = self.model_url(&self.config.model, "generateContent");
        let response = self.post(&url, &self.request(prompt)).await?;

        let gen_response: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Llm(format!("Failed to parse Gemini response: {}", e)))?;

        Ok(gen_response.text())
    }

    async fn generate_stream(&self, prompt: &str) -> Result<ChunkStream> {
        let url = format!(
            "{}?alt=sse",
            self.model_url(&self.config.model, "streamGenerateContent")
        );
        let response = self.post(&url, &self.request(prompt)).await?;

        tracing::debug!("Gemini stream opened for model {}", self.config.model);

        let stream = lines(response.bytes_stream()).filter_map(|line| async move {
            match line {
                Ok(line) => decode_sse_line(&line),
                Err(e) => Some(Err(e)),
            }
        });

        Ok(stream.boxed())
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!(
            "{}/v1beta/models/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );
        match self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .send()
            .await
        {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = self.model_url(&self.config.embedding_model, "embedContent");
        let request = self.embed_request(text);

        let response = self
            .post(&url, &request)
            .await
            .map_err(|e| Error::embedding(e.to_string()))?;

        let embed_response: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::embedding(format!("Failed to parse embedding response: {}", e)))?;

        Ok(embed_response.embedding.values)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = self.model_url(&self.config.embedding_model, "batchEmbedContents");
        let mut vectors = Vec::with_capacity(texts.len());

        for request in self.batch_requests(texts) {
            let expected = request.requests.len();
            let response = self
                .post(&url, &request)
                .await
                .map_err(|e| Error::embedding(e.to_string()))?;

            let batch: BatchEmbedResponse = response.json().await.map_err(|e| {
                Error::embedding(format!("Failed to parse batch embedding response: {}", e))
            })?;

            if batch.embeddings.len() != expected {
                return Err(Error::embedding(format!(
                    "Expected {} embeddings, got {}",
                    expected,
                    batch.embeddings.len()
                )));
            }

            vectors.extend(batch.embeddings.into_iter().map(|e| e.values));
            tracing::debug!("Embedded {}/{} texts", vectors.len(), texts.len());
        }

        Ok(vectors)
    }

    async fn health_check(&self) -> Result<bool> {
        LlmProvider::health_check(self).await
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
