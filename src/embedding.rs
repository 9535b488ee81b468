//! Embedding client abstraction and remote implementations.
//!
//! [`EmbeddingClient`] maps a batch of texts to vectors, index-aligned
//! with the input. Two implementations:
//!
//! - **[`OpenAiEmbeddings`]** — OpenAI-compatible `POST /v1/embeddings`
//!   with batching, retry, and backoff.
//! - **[`OllamaEmbeddings`]** — a local Ollama instance's `/api/embed`
//!   endpoint.
//!
//! # Retry strategy
//!
//! Transient errors are retried with exponential backoff:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)
//!
//! Any failure surfaces as [`RagError::EmbeddingService`]; the caller
//! treats the whole batch as failed and performs no partial writes.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::config::EmbeddingConfig;
use crate::error::{RagError, Result};

/// Maps a batch of texts to embedding vectors, one per input, in order.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embed a single query text.
///
/// Convenience wrapper around [`EmbeddingClient::embed`] for the retrieval
/// path, which embeds one question at a time.
pub async fn embed_query(client: &dyn EmbeddingClient, text: &str) -> Result<Vec<f32>> {
    let results = client.embed(&[text.to_string()]).await?;
    results
        .into_iter()
        .next()
        .ok_or_else(|| RagError::EmbeddingService("empty embedding response".to_string()))
}

/// Create the configured embedding client.
///
/// The OpenAI provider reads `OPENAI_API_KEY` from the environment;
/// Ollama needs no key.
pub fn create_client(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingClient>> {
    match config.provider.as_str() {
        "openai" => {
            let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
                RagError::InvalidConfiguration(
                    "OPENAI_API_KEY environment variable not set".to_string(),
                )
            })?;
            Ok(Box::new(OpenAiEmbeddings::new(
                config.model.clone(),
                config
                    .url
                    .clone()
                    .unwrap_or_else(|| "https://api.openai.com".to_string()),
                api_key,
                config.max_retries,
                config.timeout_secs,
            )))
        }
        "ollama" => Ok(Box::new(OllamaEmbeddings::new(
            config.model.clone(),
            config
                .url
                .clone()
                .unwrap_or_else(|| "http://localhost:11434".to_string()),
            config.max_retries,
            config.timeout_secs,
        ))),
        other => Err(RagError::InvalidConfiguration(format!(
            "unknown embedding provider: {other}"
        ))),
    }
}

// ============ OpenAI-compatible provider ============

/// Embedding client for OpenAI-compatible `/v1/embeddings` endpoints.
pub struct OpenAiEmbeddings {
    model: String,
    base_url: String,
    api_key: String,
    max_retries: u32,
    timeout_secs: u64,
}

impl OpenAiEmbeddings {
    pub fn new(
        model: String,
        base_url: String,
        api_key: String,
        max_retries: u32,
        timeout_secs: u64,
    ) -> Self {
        Self {
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            max_retries,
            timeout_secs,
        }
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbeddings {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let client = http_client(self.timeout_secs)?;
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let url = format!("{}/v1/embeddings", self.base_url);
        debug!(count = texts.len(), model = %self.model, "embedding batch");

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            backoff(attempt).await;

            let resp = client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response
                            .json()
                            .await
                            .map_err(|e| RagError::EmbeddingService(e.to_string()))?;
                        return parse_openai_embeddings(&json);
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(format!("embeddings API error {status}: {body_text}"));
                        continue;
                    }

                    // Client error (not 429) — don't retry.
                    return Err(RagError::EmbeddingService(format!(
                        "embeddings API error {status}: {body_text}"
                    )));
                }
                Err(e) => {
                    last_err = Some(e.to_string());
                    continue;
                }
            }
        }

        Err(RagError::EmbeddingService(
            last_err.unwrap_or_else(|| "embedding failed after retries".to_string()),
        ))
    }
}

fn parse_openai_embeddings(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| {
            RagError::EmbeddingService("invalid embeddings response: missing data array".to_string())
        })?;

    let mut embeddings = Vec::with_capacity(data.len());
    for item in data {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| {
                RagError::EmbeddingService(
                    "invalid embeddings response: missing embedding".to_string(),
                )
            })?;
        let vec: Vec<f32> = embedding
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        embeddings.push(vec);
    }

    Ok(embeddings)
}

// ============ Ollama provider ============

/// Embedding client for a local Ollama instance.
pub struct OllamaEmbeddings {
    model: String,
    base_url: String,
    max_retries: u32,
    timeout_secs: u64,
}

impl OllamaEmbeddings {
    pub fn new(model: String, base_url: String, max_retries: u32, timeout_secs: u64) -> Self {
        Self {
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries,
            timeout_secs,
        }
    }
}

#[async_trait]
impl EmbeddingClient for OllamaEmbeddings {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let client = http_client(self.timeout_secs)?;
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let url = format!("{}/api/embed", self.base_url);

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            backoff(attempt).await;

            let resp = client.post(&url).json(&body).send().await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response
                            .json()
                            .await
                            .map_err(|e| RagError::EmbeddingService(e.to_string()))?;
                        return parse_ollama_embeddings(&json);
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(format!("Ollama API error {status}: {body_text}"));
                        continue;
                    }

                    return Err(RagError::EmbeddingService(format!(
                        "Ollama API error {status}: {body_text}"
                    )));
                }
                Err(e) => {
                    last_err = Some(format!(
                        "Ollama connection error (is Ollama running at {}?): {e}",
                        self.base_url
                    ));
                    continue;
                }
            }
        }

        Err(RagError::EmbeddingService(
            last_err.unwrap_or_else(|| "Ollama embedding failed after retries".to_string()),
        ))
    }
}

fn parse_ollama_embeddings(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| {
            RagError::EmbeddingService(
                "invalid Ollama response: missing embeddings array".to_string(),
            )
        })?;

    let mut result = Vec::with_capacity(embeddings.len());
    for embedding in embeddings {
        let vec: Vec<f32> = embedding
            .as_array()
            .ok_or_else(|| {
                RagError::EmbeddingService(
                    "invalid Ollama response: embedding is not an array".to_string(),
                )
            })?
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        result.push(vec);
    }

    Ok(result)
}

fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| RagError::EmbeddingService(e.to_string()))
}

/// Exponential backoff before retry attempts: 1s, 2s, 4s, ... capped at 2^5.
async fn backoff(attempt: u32) {
    if attempt > 0 {
        let delay = Duration::from_secs(1 << (attempt - 1).min(5));
        tokio::time::sleep(delay).await;
    }
}
