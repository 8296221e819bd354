//! Chroma vector store over the v1 REST API
//!
//! Embeddings are computed client-side through an [`EmbeddingProvider`] and sent with
//! every add and query. Every filter field is pushed down as a Chroma `where` clause.
//! Chroma metadata values are scalars, so each allocated project is also written as
//! its own boolean key (`project::<name>`) that the project filter matches on.

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::sync::Arc;

use crate::config::VectorDbConfig;
use crate::error::{Error, Result};
use crate::providers::embedding::EmbeddingProvider;
use crate::providers::vector_store::{check_add_lengths, VectorStoreProvider};
use crate::types::{DocumentMetadata, QueryFilter, RetrievalHit, RetrievalResult};

/// Prefix of the per-project membership keys
const PROJECT_KEY_PREFIX: &str = "project::";

/// Chroma collection client
pub struct ChromaStore {
    client: Client,
    base_url: String,
    collection: String,
    /// Server-side collection id; replaced when the collection is recreated
    collection_id: RwLock<String>,
    embedder: Arc<dyn EmbeddingProvider>,
}

#[derive(Serialize)]
struct CreateCollectionRequest<'a> {
    name: &'a str,
    get_or_create: bool,
    metadata: Value,
}

#[derive(Deserialize)]
struct CollectionResponse {
    id: String,
}

#[derive(Serialize)]
struct AddRequest<'a> {
    ids: &'a [String],
    embeddings: Vec<Vec<f32>>,
    documents: &'a [String],
    metadatas: Vec<Map<String, Value>>,
}

#[derive(Serialize)]
struct QueryRequest {
    query_embeddings: Vec<Vec<f32>>,
    n_results: usize,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    where_clause: Option<Value>,
    include: [&'static str; 3],
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    ids: Vec<Vec<String>>,
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<Map<String, Value>>>>>,
    #[serde(default)]
    distances: Option<Vec<Vec<f32>>>,
}

#[derive(Serialize)]
struct GetRequest<'a> {
    ids: &'a [String],
    include: [&'static str; 0],
}

#[derive(Deserialize)]
struct GetResponse {
    #[serde(default)]
    ids: Vec<String>,
}

impl ChromaStore {
    /// Connect to Chroma, creating the collection when it does not exist
    pub async fn connect(
        config: &VectorDbConfig,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = config.chroma_url.trim_end_matches('/').to_string();
        let collection_id = create_collection(&client, &base_url, &config.collection).await?;

        tracing::info!(
            "Connected to Chroma at {} (collection {} / {})",
            base_url,
            config.collection,
            collection_id
        );

        Ok(Self {
            client,
            base_url,
            collection: config.collection.clone(),
            collection_id: RwLock::new(collection_id),
            embedder,
        })
    }

    fn collection_url(&self, op: &str) -> String {
        format!(
            "{}/api/v1/collections/{}/{}",
            self.base_url,
            self.collection_id.read(),
            op
        )
    }

    async fn post_json<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::vector_db(format!("Chroma request failed: {}", e)))?;
        check_status(response).await
    }
}

async fn create_collection(client: &Client, base_url: &str, name: &str) -> Result<String> {
    let request = CreateCollectionRequest {
        name,
        get_or_create: true,
        metadata: json!({ "hnsw:space": "cosine" }),
    };

    let response = client
        .post(format!("{}/api/v1/collections", base_url))
        .json(&request)
        .send()
        .await
        .map_err(|e| Error::vector_db(format!("Failed to reach Chroma at {}: {}", base_url, e)))?;

    let collection: CollectionResponse = check_status(response)
        .await?
        .json()
        .await
        .map_err(|e| Error::vector_db(format!("Invalid collection response: {}", e)))?;

    Ok(collection.id)
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(Error::vector_db(format!("Chroma returned HTTP {}: {}", status, body)))
}

fn project_key(project: &str) -> String {
    format!("{}{}", PROJECT_KEY_PREFIX, project)
}

/// Stored metadata plus one membership key per allocated project
fn store_map(metadata: &DocumentMetadata) -> Map<String, Value> {
    let mut map = metadata.to_store_map();
    for project in metadata.project_names() {
        map.insert(project_key(project), Value::Bool(true));
    }
    map
}

/// Translate a filter into a Chroma `where` clause; `None` when it has no fields
fn where_clause(filter: &QueryFilter) -> Option<Value> {
    let mut terms: Vec<(String, Value)> = Vec::new();
    if let Some(entity) = &filter.entity {
        terms.push(("entity".to_string(), json!(entity)));
    }
    if let Some(period) = &filter.period {
        terms.push(("period".to_string(), json!(period)));
    }
    if let Some(project) = &filter.project {
        terms.push((project_key(project), Value::Bool(true)));
    }

    let mut clauses: Vec<Value> = terms
        .into_iter()
        .map(|(key, value)| {
            let mut term = Map::new();
            term.insert(key, json!({ "$eq": value }));
            Value::Object(term)
        })
        .collect();

    match clauses.len() {
        0 => None,
        1 => clauses.pop(),
        _ => Some(json!({ "$and": clauses })),
    }
}

/// Flatten the first query's columns into hits
fn collect_hits(response: QueryResponse) -> Vec<RetrievalHit> {
    let ids = response.ids.into_iter().next().unwrap_or_default();
    let mut documents = response
        .documents
        .and_then(|d| d.into_iter().next())
        .unwrap_or_default()
        .into_iter();
    let mut metadatas = response
        .metadatas
        .and_then(|m| m.into_iter().next())
        .unwrap_or_default()
        .into_iter();
    let mut distances = response
        .distances
        .and_then(|d| d.into_iter().next())
        .unwrap_or_default()
        .into_iter();

    ids.into_iter()
        .map(|id| {
            let document = documents.next().flatten().unwrap_or_default();
            let metadata = metadatas
                .next()
                .flatten()
                .map(|map| DocumentMetadata::from_store_map(&map, &id))
                .unwrap_or_else(|| DocumentMetadata::new(id.clone()));
            let distance = distances.next().unwrap_or(f32::MAX);
            RetrievalHit {
                document,
                metadata,
                distance,
            }
        })
        .collect()
}

#[async_trait]
impl VectorStoreProvider for ChromaStore {
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
        let request = AddRequest {
            ids,
            embeddings,
            documents,
            metadatas: metadatas.iter().map(store_map).collect(),
        };

        self.post_json(&self.collection_url("add"), &request).await?;
        tracing::debug!("Added {} documents to {}", ids.len(), self.collection);
        Ok(())
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
        let request = QueryRequest {
            query_embeddings: vec![embedding],
            n_results: k,
            where_clause: filter.and_then(where_clause),
            include: ["documents", "metadatas", "distances"],
        };

        let response: QueryResponse = self
            .post_json(&self.collection_url("query"), &request)
            .await?
            .json()
            .await
            .map_err(|e| Error::vector_db(format!("Invalid query response: {}", e)))?;

        let mut result = RetrievalResult::from_hits(collect_hits(response));
        result.truncate(k);
        Ok(result)
    }

    async fn count(&self) -> Result<usize> {
        let response = self
            .client
            .get(self.collection_url("count"))
            .send()
            .await
            .map_err(|e| Error::vector_db(format!("Chroma request failed: {}", e)))?;

        check_status(response)
            .await?
            .json::<usize>()
            .await
            .map_err(|e| Error::vector_db(format!("Invalid count response: {}", e)))
    }

    async fn existing_ids(&self, ids: &[String]) -> Result<HashSet<String>> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }

        let response: GetResponse = self
            .post_json(&self.collection_url("get"), &GetRequest { ids, include: [] })
            .await?
            .json()
            .await
            .map_err(|e| Error::vector_db(format!("Invalid get response: {}", e)))?;

        Ok(response.ids.into_iter().collect())
    }

    async fn reset(&self) -> Result<()> {
        let url = format!("{}/api/v1/collections/{}", self.base_url, self.collection);
        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(|e| Error::vector_db(format!("Chroma request failed: {}", e)))?;

        // A missing collection is already reset
        if !response.status().is_success() {
            tracing::debug!(
                "Delete of collection {} returned HTTP {}",
                self.collection,
                response.status()
            );
        }

        let id = create_collection(&self.client, &self.base_url, &self.collection).await?;
        *self.collection_id.write() = id;
        tracing::info!("Collection {} reset", self.collection);
        Ok(())
    }

    async fn health_check(&self) -> Result<bool> {
        match self
            .client
            .get(format!("{}/api/v1/heartbeat", self.base_url))
            .send()
            .await
        {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "chroma"
    }
}
