//! Chat completion client
//!
//! Talks to the OpenAI chat completions API on behalf of the caller's
//! credential. Two modes:
//!
//! - [`OpenAiChatClient::complete`] issues one blocking completion and
//!   returns the provider's parsed JSON body untouched, so handlers
//!   can pass the provider response through to the caller.
//! - [`OpenAiChatClient::stream`] issues a streaming completion and
//!   forwards content deltas through a channel as the provider emits
//!   them. The SSE byte stream is split on newlines by a carry-over
//!   buffer, so fragments arriving at arbitrary byte boundaries are
//!   never dropped or reordered. Dropping the receiver stops the
//!   forwarding task and releases the upstream connection.

use crate::auth::ApiKey;
use crate::config::OpenAiConfig;
use crate::errors::{AppError, Result};
use futures::StreamExt;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A role-tagged chat message
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

/// OpenAI chat completion client
pub struct OpenAiChatClient {
    client: reqwest::Client,
    api_key: ApiKey,
    model: String,
    base_url: String,
    request_timeout: Duration,
}

impl OpenAiChatClient {
    pub fn new(config: &OpenAiConfig, api_key: ApiKey, model: String) -> Result<Self> {
        // Only a connect timeout on the client itself: a total timeout
        // would cut long-lived streaming responses short. Non-streaming
        // calls apply `request_timeout` per request.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.chat_connect_timeout_secs))
            .build()
            .map_err(AppError::HttpClient)?;

        Ok(Self {
            client,
            api_key,
            model,
            base_url: config.api_base.clone(),
            request_timeout: Duration::from_secs(config.chat_timeout_secs),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One blocking completion. Returns the provider's response body as
    /// parsed JSON, passed through without reshaping.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<serde_json::Value> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = CompletionRequest {
            model: &self.model,
            messages,
            stream: None,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose())
            .json(&request)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| AppError::Chat {
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Chat {
                message: format!("API error {}: {}", status, body),
            });
        }

        response.json().await.map_err(|e| AppError::Chat {
            message: format!("Failed to parse response: {}", e),
        })
    }

    /// One streaming completion. The returned channel yields content
    /// deltas in emission order; it closes after `[DONE]`, upstream
    /// EOF, or a transport error (delivered as the final item).
    ///
    /// The request is sent and its status checked before this returns,
    /// so provider rejections surface as an error, not an empty stream.
    pub async fn stream(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<mpsc::Receiver<Result<String>>> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = CompletionRequest {
            model: &self.model,
            messages: &messages,
            stream: Some(true),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose())
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Chat {
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Chat {
                message: format!("API error {}: {}", status, body),
            });
        }

        let (tx, rx) = mpsc::channel(64);
        let model = self.model.clone();

        tokio::spawn(async move {
            let mut bytes = response.bytes_stream();
            let mut lines = SseLineBuffer::default();

            'outer: while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        warn!(model = %model, error = %e, "Chat stream transport error");
                        let _ = tx
                            .send(Err(AppError::Chat {
                                message: format!("Stream error: {}", e),
                            }))
                            .await;
                        return;
                    }
                };

                for line in lines.push(&chunk) {
                    match parse_sse_line(&line) {
                        SseLine::Delta(content) => {
                            // A failed send means the consumer is gone;
                            // stop and let the response drop.
                            if tx.send(Ok(content)).await.is_err() {
                                debug!(model = %model, "Chat stream consumer disconnected");
                                break 'outer;
                            }
                        }
                        SseLine::Done => break 'outer,
                        SseLine::Ignore => {}
                    }
                }
            }
        });

        Ok(rx)
    }
}

/// Reassembles SSE lines from a byte stream that may split anywhere.
#[derive(Default)]
pub(crate) struct SseLineBuffer {
    buf: Vec<u8>,
}

impl SseLineBuffer {
    /// Feed bytes in, take complete lines out. Incomplete trailing
    /// bytes stay buffered for the next call.
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }
}

pub(crate) enum SseLine {
    /// A content fragment from a `data:` event
    Delta(String),
    /// The `[DONE]` terminator
    Done,
    /// Comments, empty keep-alive lines, deltas without content
    Ignore,
}

/// Extract the content delta from one SSE line, if it carries one.
pub(crate) fn parse_sse_line(line: &str) -> SseLine {
    let Some(data) = line.strip_prefix("data:").map(str::trim_start) else {
        return SseLine::Ignore;
    };

    if data == "[DONE]" {
        return SseLine::Done;
    }

    let Ok(json) = serde_json::from_str::<serde_json::Value>(data) else {
        return SseLine::Ignore;
    };

    match json
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("delta"))
        .and_then(|d| d.get("content"))
        .and_then(|c| c.as_str())
    {
        Some(content) if !content.is_empty() => SseLine::Delta(content.to_string()),
        _ => SseLine::Ignore,
    }
}
