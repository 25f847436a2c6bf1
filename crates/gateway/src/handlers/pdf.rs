//! PDF upload and retrieval-augmented chat handlers

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;
use validator::Validate;

use crate::AppState;
use docchat_common::{
    auth::ApiKey,
    chat::{ChatMessage, OpenAiChatClient},
    embeddings::{Embedder, OpenAiEmbedder},
    errors::{AppError, Result},
    metrics,
};
use docchat_index::{IndexError, IndexSnapshot, ScoredChunk};
use docchat_ingestion::{chunk_text, extract_document, ChunkingConfig};

/// Separator between retrieved chunks in the prompt context
pub const CONTEXT_SEPARATOR: &str = "\n---\n";

/// Successful upload response
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub status: String,
    pub num_chunks: usize,
}

/// Retrieval-augmented chat request
#[derive(Debug, Deserialize, Validate)]
pub struct PdfChatRequest {
    #[validate(length(min = 1, message = "user_message must not be empty"))]
    pub user_message: String,

    /// Number of chunks to retrieve
    #[serde(default = "default_k")]
    #[validate(range(min = 1, message = "k must be at least 1"))]
    pub k: usize,

    pub api_key: ApiKey,
}

fn default_k() -> usize {
    4
}

/// Build the in-memory index from an uploaded PDF.
///
/// Extraction, chunking, and embedding all happen off to the side; the
/// process-wide index is only replaced once the new snapshot is fully
/// built, so any failure leaves the previous index authoritative.
pub async fn upload_pdf(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;
    let mut api_key: Option<ApiKey> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| AppError::Validation {
        message: format!("Failed to read multipart field: {}", e),
        field: None,
    })? {
        let field_name = field.name().unwrap_or("").to_string();
        match field_name.as_str() {
            "file" => {
                filename = field.file_name().map(|s| s.to_string());
                let bytes = field.bytes().await.map_err(|e| AppError::Validation {
                    message: format!("Failed to read file: {}", e),
                    field: Some("file".to_string()),
                })?;
                file_bytes = Some(bytes.to_vec());
            }
            "api_key" => {
                let text = field.text().await.map_err(|e| AppError::Validation {
                    message: format!("Failed to read api_key: {}", e),
                    field: Some("api_key".to_string()),
                })?;
                api_key = Some(ApiKey::new(text));
            }
            _ => {}
        }
    }

    let file = file_bytes.ok_or_else(|| AppError::Validation {
        message: "file field is required".to_string(),
        field: Some("file".to_string()),
    })?;
    let api_key = api_key
        .filter(|k| !k.is_empty())
        .ok_or_else(|| AppError::Validation {
            message: "api_key field is required".to_string(),
            field: Some("api_key".to_string()),
        })?;

    info!(
        file = filename.as_deref().unwrap_or("upload.pdf"),
        size_bytes = file.len(),
        api_key = %api_key,
        "PDF upload received"
    );

    let start = Instant::now();

    // Extract one text block per page, then chunk over the flattened
    // document so boundaries do not reset at page breaks.
    let blocks = extract_document(&file).map_err(|e| AppError::Extraction {
        message: e.to_string(),
    })?;
    let text = blocks.join("\n");

    let chunking = ChunkingConfig {
        chunk_size: state.config.chunking.chunk_size,
        chunk_overlap: state.config.chunking.chunk_overlap,
    };
    let chunks = chunk_text(&text, &chunking);
    let texts: Vec<String> = chunks.into_iter().map(|c| c.content).collect();

    info!(num_chunks = texts.len(), "Document chunked");

    let embedder = OpenAiEmbedder::new(&state.config.openai, api_key)?;
    let build_timeout = state.config.build_timeout();
    let embeddings = tokio::time::timeout(build_timeout, embedder.embed_batch(&texts))
        .await
        .map_err(|_| AppError::EmbeddingTimeout {
            timeout_ms: build_timeout.as_millis() as u64,
        })??;

    let snapshot = IndexSnapshot::build(texts, embeddings, embedder.model_name())
        .map_err(index_error)?;
    let num_chunks = snapshot.len();

    state.index.publish(snapshot);

    let elapsed = start.elapsed();
    metrics::record_ingestion(elapsed.as_secs_f64(), num_chunks);
    info!(
        num_chunks,
        latency_ms = elapsed.as_millis() as u64,
        "Index built and published"
    );

    Ok(Json(UploadResponse {
        status: "success".to_string(),
        num_chunks,
    }))
}

/// Answer a question grounded in the uploaded PDF.
///
/// The provider's response body is passed through to the caller
/// unchanged.
pub async fn chat_with_pdf(
    State(state): State<AppState>,
    Json(request): Json<PdfChatRequest>,
) -> Result<Json<serde_json::Value>> {
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

    let snapshot = state.index.current().ok_or(AppError::NotIndexed)?;

    let start = Instant::now();

    // Query embeddings must come from the model the index was built
    // with, so the snapshot's recorded model wins over configuration.
    let embedder = OpenAiEmbedder::with_model(
        &state.config.openai,
        request.api_key.clone(),
        snapshot.model().to_string(),
    )?;
    let query_embedding = embedder.embed(&request.user_message).await?;

    let hits = snapshot.search(&query_embedding, request.k);
    metrics::record_search(start.elapsed().as_secs_f64(), hits.len());

    let messages = rag_messages(&hits, &request.user_message);

    let client = OpenAiChatClient::new(
        &state.config.openai,
        request.api_key,
        state.config.openai.rag_chat_model.clone(),
    )?;
    let response = client.complete(&messages).await?;

    info!(
        k = request.k,
        retrieved = hits.len(),
        generation = %snapshot.id(),
        latency_ms = start.elapsed().as_millis() as u64,
        "Retrieval-augmented chat completed"
    );

    Ok(Json(response))
}

/// Join retrieved chunk texts into one context block.
pub fn build_context(hits: &[ScoredChunk]) -> String {
    hits.iter()
        .map(|h| h.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// Assemble the grounded prompt: a system instruction carrying the
/// retrieved context, then the user's question.
pub fn rag_messages(hits: &[ScoredChunk], user_message: &str) -> Vec<ChatMessage> {
    let context = build_context(hits);
    let system = format!(
        "You are an AI assistant. Use the following PDF context to answer the user's question as accurately as possible.\n\
         If the answer is not in the context, say you don't know.\n\nContext:\n{}",
        context
    );

    vec![
        ChatMessage::new("system", system),
        ChatMessage::new("user", user_message),
    ]
}

fn index_error(e: IndexError) -> AppError {
    match e {
        IndexError::Empty => AppError::Extraction {
            message: e.to_string(),
        },
        IndexError::LengthMismatch { .. } | IndexError::DimensionMismatch { .. } => {
            AppError::Embedding {
                message: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_router, AppState};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use docchat_common::config::AppConfig;
    use tower::ServiceExt;

    fn scored(index: usize, text: &str) -> ScoredChunk {
        ScoredChunk {
            index,
            text: text.to_string(),
            score: 1.0 - index as f32 * 0.1,
        }
    }

    #[test]
    fn k_defaults_to_four() {
        let request: PdfChatRequest =
            serde_json::from_str(r#"{"user_message":"what is this?","api_key":"sk-test"}"#)
                .unwrap();
        assert_eq!(request.k, 4);
    }

    #[test]
    fn zero_k_fails_validation() {
        let request: PdfChatRequest =
            serde_json::from_str(r#"{"user_message":"q","k":0,"api_key":"sk-test"}"#).unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn context_joins_chunks_with_separator() {
        let hits = vec![scored(0, "first chunk"), scored(1, "second chunk")];
        let context = build_context(&hits);
        assert_eq!(context, "first chunk\n---\nsecond chunk");
        assert_eq!(context.matches(CONTEXT_SEPARATOR).count(), 1);
    }

    #[test]
    fn rag_prompt_carries_context_and_question() {
        let hits = vec![scored(0, "alpha"), scored(1, "beta")];
        let messages = rag_messages(&hits, "what is alpha?");

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert!(messages[0].content.contains("alpha\n---\nbeta"));
        assert!(messages[0].content.contains("say you don't know"));
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[1].content, "what is alpha?");
    }

    #[tokio::test]
    async fn chat_with_pdf_before_upload_returns_400() {
        let app = create_router(AppState::new(AppConfig::default()));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/chat_with_pdf")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"user_message":"anything there?","api_key":"sk-test"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["error"]
            .as_str()
            .unwrap()
            .contains("No PDF indexed"));
    }
}
