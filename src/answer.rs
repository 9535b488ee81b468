//! Answer model abstraction and OpenAI-compatible implementation.
//!
//! [`AnswerModel`] has two operating modes: a single blocking completion,
//! and a streaming variant that pushes raw incremental text deltas into a
//! channel as they arrive from the service. Token boundaries are whatever
//! the model emits — consumers must not assume they align with words or
//! sentences.
//!
//! The streaming wire format is server-sent events: `data: {json}` lines,
//! terminated by `data: [DONE]`. Ollama's OpenAI-compatible endpoint
//! speaks the same protocol, so one implementation covers both.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::mpsc;

use crate::config::AnswerConfig;
use crate::error::{RagError, Result};

/// A chat/completion model invoked as an opaque remote service.
#[async_trait]
pub trait AnswerModel: Send + Sync {
    /// One call with the full prompt; returns the complete answer text.
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Stream incremental text deltas into `sink` in generation order.
    /// Returns once the model signals completion. A closed sink (the
    /// consumer abandoned the stream) stops generation without error.
    async fn stream(&self, prompt: &str, sink: mpsc::Sender<String>) -> Result<()>;
}

/// Create the configured answer model client, reading `OPENAI_API_KEY`
/// from the environment when the default OpenAI endpoint is used.
pub fn create_model(config: &AnswerConfig) -> Result<Box<dyn AnswerModel>> {
    let base_url = config
        .url
        .clone()
        .unwrap_or_else(|| "https://api.openai.com".to_string());
    // A non-OpenAI base URL (e.g. Ollama) needs no key.
    let api_key = if is_openai_endpoint(&base_url) {
        std::env::var("OPENAI_API_KEY").map_err(|_| {
            RagError::InvalidConfiguration("OPENAI_API_KEY environment variable not set".to_string())
        })?
    } else {
        std::env::var("OPENAI_API_KEY").unwrap_or_default()
    };

    Ok(Box::new(OpenAiChatModel::new(
        config.model.clone(),
        base_url,
        api_key,
        config.timeout_secs,
    )))
}

/// Whether `base_url` points at OpenAI's hosted API. Matches on the
/// parsed host, not a substring: a proxy URL that merely embeds the
/// hostname somewhere in its path (or a look-alike domain such as
/// `api.openai.com.evil.example`) must not count.
fn is_openai_endpoint(base_url: &str) -> bool {
    reqwest::Url::parse(base_url)
        .ok()
        .and_then(|url| {
            url.host_str()
                .map(|host| host.eq_ignore_ascii_case("api.openai.com"))
        })
        .unwrap_or(false)
}

/// OpenAI-compatible `/v1/chat/completions` client.
pub struct OpenAiChatModel {
    model: String,
    base_url: String,
    api_key: String,
    timeout_secs: u64,
}

impl OpenAiChatModel {
    pub fn new(model: String, base_url: String, api_key: String, timeout_secs: u64) -> Self {
        Self {
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout_secs,
        }
    }

    fn client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| RagError::AnswerService(e.to_string()))
    }

    fn request(&self, client: &reqwest::Client, body: &serde_json::Value) -> reqwest::RequestBuilder {
        let mut req = client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .json(body);
        if !self.api_key.is_empty() {
            req = req.header("Authorization", format!("Bearer {}", self.api_key));
        }
        req
    }
}

#[async_trait]
impl AnswerModel for OpenAiChatModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let client = self.client()?;
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
        });

        let response = self
            .request(&client, &body)
            .send()
            .await
            .map_err(|e| RagError::AnswerService(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(RagError::AnswerService(format!(
                "chat API error {status}: {body_text}"
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RagError::AnswerService(e.to_string()))?;

        let answer = json
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| {
                RagError::AnswerService("invalid chat response: missing message content".to_string())
            })?;

        Ok(answer.trim().to_string())
    }

    async fn stream(&self, prompt: &str, sink: mpsc::Sender<String>) -> Result<()> {
        let client = self.client()?;
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "stream": true,
        });

        let response = self
            .request(&client, &body)
            .send()
            .await
            .map_err(|e| RagError::AnswerService(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(RagError::AnswerService(format!(
                "chat API error {status}: {body_text}"
            )));
        }

        let mut bytes = response.bytes_stream();
        let mut buffer = String::new();

        while let Some(piece) = bytes.next().await {
            let piece = piece.map_err(|e| RagError::AnswerService(e.to_string()))?;
            buffer.push_str(&String::from_utf8_lossy(&piece));

            // Process every complete line; keep the trailing partial line
            // buffered for the next read.
            while let Some(newline) = buffer.find('\n') {
                let line = buffer[..newline].trim().to_string();
                buffer.drain(..=newline);

                let Some(data) = line.strip_prefix("data:") else {
                    continue;
                };
                let data = data.trim();
                if data == "[DONE]" {
                    return Ok(());
                }
                if let Some(delta) = parse_stream_delta(data) {
                    if sink.send(delta).await.is_err() {
                        // Consumer abandoned the stream.
                        return Ok(());
                    }
                }
            }
        }

        Ok(())
    }
}

/// Extract the incremental content from one SSE payload, if any. Events
/// without a text delta (role preludes, finish markers) yield `None`.
fn parse_stream_delta(data: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(data).ok()?;
    let content = json
        .get("choices")?
        .get(0)?
        .get("delta")?
        .get("content")?
        .as_str()?;
    if content.is_empty() {
        None
    } else {
        Some(content.to_string())
    }
}
