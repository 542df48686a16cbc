//! Qdrant-compatible REST backend for [`VectorIndex`].
//!
//! Talks plain JSON over HTTP to the configured URI: collection ensure
//! (`PUT /collections/{name}`), point upsert
//! (`PUT /collections/{name}/points`), and similarity search
//! (`POST /collections/{name}/points/search`). The optional API key is
//! read from the environment variable named in config and sent as the
//! `api-key` header.
//!
//! Connection and protocol failures map to
//! [`PipelineError::StoreUnavailable`]; the store's own concurrency
//! guarantees cover concurrent ingestion and retrieval, so there is no
//! caller-side locking here.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::StoreConfig;
use crate::error::PipelineError;
use crate::models::{Chunk, ScoredChunk};

use super::{IndexedRecord, VectorIndex};

pub struct QdrantIndex {
    uri: String,
    api_key: Option<String>,
    dims: usize,
    client: reqwest::Client,
}

impl QdrantIndex {
    pub fn new(config: &StoreConfig, dims: usize) -> anyhow::Result<Self> {
        let api_key = match &config.api_key_env {
            Some(var) => Some(std::env::var(var).map_err(|_| {
                anyhow::anyhow!("{} environment variable not set", var)
            })?),
            None => None,
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            uri: config.uri.trim_end_matches('/').to_string(),
            api_key,
            dims,
            client,
        })
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }

    /// Create the collection if it does not exist yet. Idempotent.
    async fn ensure_collection(&self, collection: &str) -> Result<(), PipelineError> {
        let url = format!("{}/collections/{}", self.uri, collection);
        let response = self
            .request(self.client.get(&url))
            .send()
            .await
            .map_err(store_unavailable)?;

        if response.status().is_success() {
            return Ok(());
        }
        if response.status() != reqwest::StatusCode::NOT_FOUND {
            return Err(status_error("collection lookup", response).await);
        }

        let body = serde_json::json!({
            "vectors": { "size": self.dims, "distance": "Cosine" }
        });
        let response = self
            .request(self.client.put(&url))
            .json(&body)
            .send()
            .await
            .map_err(store_unavailable)?;
        if !response.status().is_success() {
            return Err(status_error("collection create", response).await);
        }
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn add(
        &self,
        collection: &str,
        records: Vec<IndexedRecord>,
    ) -> Result<usize, PipelineError> {
        self.ensure_collection(collection).await?;

        let count = records.len();
        let points: Vec<serde_json::Value> = records
            .into_iter()
            .map(|record| {
                serde_json::json!({
                    "id": record.id,
                    "vector": record.vector,
                    "payload": {
                        "text": record.chunk.text,
                        "source": record.chunk.source,
                        "hash": record.chunk.hash,
                        "ingested_at": record.ingested_at,
                    }
                })
            })
            .collect();

        let url = format!("{}/collections/{}/points?wait=true", self.uri, collection);
        let response = self
            .request(self.client.put(&url))
            .json(&serde_json::json!({ "points": points }))
            .send()
            .await
            .map_err(store_unavailable)?;
        if !response.status().is_success() {
            return Err(status_error("point upsert", response).await);
        }
        Ok(count)
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredChunk>, PipelineError> {
        let url = format!("{}/collections/{}/points/search", self.uri, collection);
        let body = serde_json::json!({
            "vector": vector,
            "limit": k,
            "with_payload": true,
        });

        let response = self
            .request(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(store_unavailable)?;

        // A collection nothing has been written to yet is not an error;
        // it simply contributes no context.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(status_error("search", response).await);
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PipelineError::StoreUnavailable(e.to_string()))?;

        let hits = payload
            .get("result")
            .and_then(|r| r.as_array())
            .ok_or_else(|| {
                PipelineError::StoreUnavailable(
                    "invalid search response: missing result array".to_string(),
                )
            })?;

        Ok(hits
            .iter()
            .map(|hit| {
                let payload = &hit["payload"];
                ScoredChunk {
                    chunk: Chunk {
                        text: payload["text"].as_str().unwrap_or_default().to_string(),
                        source: payload["source"].as_str().unwrap_or_default().to_string(),
                        hash: payload["hash"].as_str().unwrap_or_default().to_string(),
                    },
                    score: hit["score"].as_f64().unwrap_or(0.0) as f32,
                }
            })
            .collect())
    }
}

fn store_unavailable(e: reqwest::Error) -> PipelineError {
    PipelineError::StoreUnavailable(e.to_string())
}

async fn status_error(operation: &str, response: reqwest::Response) -> PipelineError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    PipelineError::StoreUnavailable(format!("{} failed with {}: {}", operation, status, text))
}
