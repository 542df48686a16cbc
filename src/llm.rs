//! Generative-model capability behind the [`Completer`] trait.
//!
//! A single synchronous-looking `complete(prompt) -> text` seam; the
//! concrete client speaks the OpenAI-compatible chat-completions
//! protocol, which covers Groq, OpenAI, LM Studio, and vLLM endpoints.
//! Model identity and sampling parameters come from configuration, not
//! call sites. Transport or API failures surface as
//! [`PipelineError::UpstreamGenerationError`]; once a call is issued
//! there is no cancellation or retry here.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::PipelineError;

/// A capability that completes a prompt into free-form text.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, PipelineError>;
}

/// OpenAI-compatible chat-completions client.
pub struct ChatCompleter {
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl ChatCompleter {
    pub fn new(config: &LlmConfig) -> anyhow::Result<Self> {
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
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            api_key,
            client,
        })
    }
}

#[async_trait]
impl Completer for ChatCompleter {
    async fn complete(&self, prompt: &str) -> Result<String, PipelineError> {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.temperature,
            "stream": false,
        });
        if let (Some(obj), Some(max)) = (body.as_object_mut(), self.max_tokens) {
            obj.insert("max_tokens".to_string(), serde_json::json!(max));
        }

        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request
            .send()
            .await
            .map_err(|e| PipelineError::UpstreamGenerationError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PipelineError::UpstreamGenerationError(format!(
                "chat API error {}: {}",
                status, text
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PipelineError::UpstreamGenerationError(e.to_string()))?;

        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| {
                PipelineError::UpstreamGenerationError(
                    "chat API response missing choices[0].message.content".to_string(),
                )
            })
    }
}
