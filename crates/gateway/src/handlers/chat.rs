//! Direct chat handler
//!
//! Stateless pass-through to the chat completions API. The provider's
//! incremental tokens are forwarded to the caller as a plain-text body
//! in emission order, with no buffering beyond the channel between the
//! upstream reader and the response sink.

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::header,
    response::Response,
    Json,
};
use serde::Deserialize;
use std::convert::Infallible;
use tracing::{info, warn};
use validator::Validate;

use crate::AppState;
use docchat_common::{
    auth::ApiKey,
    chat::{ChatMessage, OpenAiChatClient},
    errors::{AppError, Result},
    metrics::RequestMetrics,
};

/// Direct chat request
#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    pub developer_message: String,

    #[validate(length(min = 1, message = "user_message must not be empty"))]
    pub user_message: String,

    /// Model override; falls back to the configured default
    #[serde(default)]
    pub model: Option<String>,

    pub api_key: ApiKey,
}

/// Stream a chat completion back to the caller
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Response> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;
    if request.api_key.is_empty() {
        return Err(AppError::Validation {
            message: "api_key must not be empty".to_string(),
            field: Some("api_key".to_string()),
        });
    }

    let model = request
        .model
        .unwrap_or_else(|| state.config.openai.chat_model.clone());

    info!(
        model = %model,
        api_key = %request.api_key,
        "Chat stream requested"
    );

    let messages = vec![
        ChatMessage::new("developer", request.developer_message),
        ChatMessage::new("user", request.user_message),
    ];

    let request_metrics = RequestMetrics::start("POST", "/api/chat");
    let client = OpenAiChatClient::new(&state.config.openai, request.api_key, model)?;
    let mut deltas = client.stream(messages).await?;
    request_metrics.finish(200);

    // The status line is already committed once the first delta is
    // forwarded; a mid-stream upstream error can only end the body.
    let body_stream = async_stream::stream! {
        while let Some(item) = deltas.recv().await {
            match item {
                Ok(delta) => yield Ok::<Bytes, Infallible>(Bytes::from(delta)),
                Err(e) => {
                    warn!(error = %e, "Ending chat stream after upstream error");
                    break;
                }
            }
        }
    };

    Response::builder()
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Body::from_stream(body_stream))
        .map_err(|e| AppError::Internal {
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_deserializes_with_default_model() {
        let request: ChatRequest = serde_json::from_str(
            r#"{"developer_message":"be brief","user_message":"hi","api_key":"sk-test"}"#,
        )
        .unwrap();
        assert!(request.model.is_none());
        assert_eq!(request.user_message, "hi");
    }

    #[test]
    fn empty_user_message_fails_validation() {
        let request: ChatRequest = serde_json::from_str(
            r#"{"developer_message":"","user_message":"","api_key":"sk-test"}"#,
        )
        .unwrap();
        assert!(request.validate().is_err());
    }
}
