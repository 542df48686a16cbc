//! Embedding capability behind the [`Embedder`] trait.
//!
//! Two remote providers are supported:
//! - **OpenAI-compatible** — `POST {url}/v1/embeddings` with a bearer key
//!   read from the environment variable named in config.
//! - **Ollama** — `POST {url}/api/embed` against a local instance.
//!
//! Failures map to [`PipelineError::EmbeddingFailure`] and propagate
//! unmasked; there is no retry loop here — the caller decides what a
//! failed vectorization means for the file being ingested.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::EmbeddingConfig;
use crate::error::PipelineError;

/// A capability that turns a batch of texts into embedding vectors,
/// one per input text, in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError>;

    /// Embedding vector dimensionality.
    fn dims(&self) -> usize;
}

/// Build the configured embedding provider.
pub fn create_embedder(config: &EmbeddingConfig) -> anyhow::Result<Box<dyn Embedder>> {
    match config.provider.as_str() {
        "openai" => Ok(Box::new(OpenAiEmbedder::new(config)?)),
        "ollama" => Ok(Box::new(OllamaEmbedder::new(config)?)),
        other => anyhow::bail!("Unknown embedding provider: {}", other),
    }
}

// ============ OpenAI-compatible provider ============

pub struct OpenAiEmbedder {
    url: String,
    model: String,
    dims: usize,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            anyhow::anyhow!("{} environment variable not set", config.api_key_env)
        })?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com".to_string());
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dims: config.dims,
            api_key,
            client,
        })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let response = self
            .client
            .post(format!("{}/v1/embeddings", self.url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::EmbeddingFailure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PipelineError::EmbeddingFailure(format!(
                "embeddings API error {}: {}",
                status, text
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PipelineError::EmbeddingFailure(e.to_string()))?;
        parse_openai_embeddings(&json)
    }

    fn dims(&self) -> usize {
        self.dims
    }
}

/// Extract `data[].embedding` arrays in input order.
fn parse_openai_embeddings(json: &serde_json::Value) -> Result<Vec<Vec<f32>>, PipelineError> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| {
            PipelineError::EmbeddingFailure("invalid response: missing data array".to_string())
        })?;

    let mut embeddings = Vec::with_capacity(data.len());
    for item in data {
        let vector = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| {
                PipelineError::EmbeddingFailure("invalid response: missing embedding".to_string())
            })?;
        embeddings.push(
            vector
                .iter()
                .map(|v| v.as_f64().unwrap_or(0.0) as f32)
                .collect(),
        );
    }
    Ok(embeddings)
}

// ============ Ollama provider ============

pub struct OllamaEmbedder {
    url: String,
    model: String,
    dims: usize,
    client: reqwest::Client,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> anyhow::Result<Self> {
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434".to_string());
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dims: config.dims,
            client,
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let response = self
            .client
            .post(format!("{}/api/embed", self.url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                PipelineError::EmbeddingFailure(format!(
                    "Ollama connection error (is Ollama running at {}?): {}",
                    self.url, e
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PipelineError::EmbeddingFailure(format!(
                "Ollama API error {}: {}",
                status, text
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PipelineError::EmbeddingFailure(e.to_string()))?;

        let embeddings = json
            .get("embeddings")
            .and_then(|e| e.as_array())
            .ok_or_else(|| {
                PipelineError::EmbeddingFailure(
                    "invalid Ollama response: missing embeddings array".to_string(),
                )
            })?;

        embeddings
            .iter()
            .map(|embedding| {
                embedding
                    .as_array()
                    .map(|vals| {
                        vals.iter()
                            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
                            .collect()
                    })
                    .ok_or_else(|| {
                        PipelineError::EmbeddingFailure(
                            "invalid Ollama response: embedding is not an array".to_string(),
                        )
                    })
            })
            .collect()
    }

    fn dims(&self) -> usize {
        self.dims
    }
}
