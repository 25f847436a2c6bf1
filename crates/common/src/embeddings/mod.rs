//! Embedding client
//!
//! Converts chunk texts into fixed-length vectors via the OpenAI
//! embeddings API. The client is constructed per request from the
//! service configuration plus the caller's credential. Failed calls
//! surface immediately; no retries happen at this layer, the caller
//! decides whether to redo the whole build.

use crate::auth::ApiKey;
use crate::config::OpenAiConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Trait for embedding generation
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, in input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the model name
    fn model_name(&self) -> &str;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;
}

/// OpenAI embedding client
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: ApiKey,
    model: String,
    dimension: usize,
    base_url: String,
    batch_size: usize,
    concurrency: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Embedding dimension for a known model name
pub fn model_dimension(model: &str) -> usize {
    match model {
        "text-embedding-ada-002" => 1536,
        "text-embedding-3-small" => 1536,
        "text-embedding-3-large" => 3072,
        _ => 1536,
    }
}

impl OpenAiEmbedder {
    /// Create an embedder from the service configuration and the
    /// caller's credential, using the configured model.
    pub fn new(config: &OpenAiConfig, api_key: ApiKey) -> Result<Self> {
        Self::with_model(config, api_key, config.embedding_model.clone())
    }

    /// Create an embedder pinned to a specific model. Query-time
    /// embedding uses this with the model recorded in the index
    /// snapshot so query and chunk vectors stay comparable.
    pub fn with_model(config: &OpenAiConfig, api_key: ApiKey, model: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.embedding_timeout_secs))
            .build()
            .map_err(AppError::HttpClient)?;

        Ok(Self {
            client,
            api_key,
            dimension: model_dimension(&model),
            model,
            base_url: config.api_base.clone(),
            batch_size: config.embedding_batch_size.max(1),
            concurrency: config.embedding_concurrency.max(1),
        })
    }

    /// One embeddings API call for up to `batch_size` inputs.
    async fn request_embeddings(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url);
        let expected = texts.len();
        let start = Instant::now();

        let request = EmbeddingRequest {
            model: self.model.clone(),
            input: texts,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                metrics::record_embedding(start.elapsed().as_secs_f64(), &self.model, false);
                AppError::Embedding {
                    message: format!("Request failed: {}", e),
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            metrics::record_embedding(start.elapsed().as_secs_f64(), &self.model, false);
            return Err(AppError::Embedding {
                message: format!("API error {}: {}", status, body),
            });
        }

        let result: EmbeddingResponse =
            response.json().await.map_err(|e| AppError::Embedding {
                message: format!("Failed to parse response: {}", e),
            })?;

        let embeddings: Vec<Vec<f32>> = result.data.into_iter().map(|d| d.embedding).collect();

        if embeddings.len() != expected {
            return Err(AppError::Embedding {
                message: format!(
                    "Provider returned {} embeddings for {} inputs",
                    embeddings.len(),
                    expected
                ),
            });
        }
        for embedding in &embeddings {
            if embedding.len() != self.dimension {
                return Err(AppError::Embedding {
                    message: format!(
                        "Embedding dimension mismatch: expected {}, got {}",
                        self.dimension,
                        embedding.len()
                    ),
                });
            }
        }

        metrics::record_embedding(start.elapsed().as_secs_f64(), &self.model, true);

        Ok(embeddings)
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.request_embeddings(vec![text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Embedding {
                message: "Empty response".to_string(),
            })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        // Sub-batches run as a bounded concurrent group; `buffered`
        // yields results in submission order no matter which request
        // finishes first.
        let batches: Vec<Vec<String>> = texts
            .chunks(self.batch_size)
            .map(|batch| batch.to_vec())
            .collect();

        let collected: Vec<Vec<Vec<f32>>> = stream::iter(batches)
            .map(|batch| self.request_embeddings(batch))
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        Ok(collected.into_iter().flatten().collect())
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Mock embedder for testing
pub struct MockEmbedder {
    dimension: usize,
}

impl MockEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        Ok((0..self.dimension).map(|_| rng.gen::<f32>()).collect())
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for _ in texts {
            embeddings.push(self.embed("").await?);
        }
        Ok(embeddings)
    }

    fn model_name(&self) -> &str {
        "mock-embedding"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serialization_matches_wire_shape() {
        let req = EmbeddingRequest {
            model: "text-embedding-3-small".to_string(),
            input: vec!["hello world".to_string()],
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model"], "text-embedding-3-small");
        assert_eq!(json["input"][0], "hello world");
    }

    #[test]
    fn response_deserialization_matches_wire_shape() {
        let json = r#"{
            "data": [
                {"embedding": [0.1, 0.2, 0.3], "index": 0, "object": "embedding"}
            ],
            "model": "text-embedding-3-small",
            "object": "list",
            "usage": {"prompt_tokens": 2, "total_tokens": 2}
        }"#;
        let resp: EmbeddingResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.data.len(), 1);
        assert_eq!(resp.data[0].embedding.len(), 3);
    }

    #[test]
    fn known_model_dimensions() {
        assert_eq!(model_dimension("text-embedding-3-small"), 1536);
        assert_eq!(model_dimension("text-embedding-3-large"), 3072);
        assert_eq!(model_dimension("something-else"), 1536);
    }

    #[tokio::test]
    async fn mock_embedder_produces_fixed_dimension() {
        let embedder = MockEmbedder::new(768);
        let embedding = embedder.embed("test text").await.unwrap();
        assert_eq!(embedding.len(), 768);
    }

    #[tokio::test]
    async fn mock_batch_preserves_count() {
        let embedder = MockEmbedder::new(768);
        let texts = vec!["text1".to_string(), "text2".to_string()];
        let embeddings = embedder.embed_batch(&texts).await.unwrap();
        assert_eq!(embeddings.len(), 2);
        assert_eq!(embeddings[0].len(), 768);
    }
}
