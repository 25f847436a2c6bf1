//! Immutable index snapshot and cosine similarity search
//!
//! One snapshot represents one fully built generation of the index:
//! the chunk texts of a single document paired with their embedding
//! vectors, plus the embedding model configuration captured at build
//! time. Search is a brute-force O(n) scan, which is fine for the
//! hundreds of chunks a single document produces.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Chunk/embedding count mismatch: {chunks} chunks, {embeddings} embeddings")]
    LengthMismatch { chunks: usize, embeddings: usize },

    #[error("Embedding dimension mismatch at chunk {at}: expected {expected}, got {got}")]
    DimensionMismatch {
        expected: usize,
        got: usize,
        at: usize,
    },

    #[error("Cannot build an index from zero chunks")]
    Empty,
}

/// One indexed chunk: text plus its embedding vector.
#[derive(Debug, Clone)]
struct IndexEntry {
    text: String,
    embedding: Vec<f32>,
}

/// A search hit, scored by cosine similarity.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    /// Insertion index of the chunk in the document
    pub index: usize,
    /// The chunk text
    pub text: String,
    /// Cosine similarity against the query vector
    pub score: f32,
}

/// An immutable, fully built generation of the vector index.
#[derive(Debug)]
pub struct IndexSnapshot {
    id: Uuid,
    built_at: DateTime<Utc>,
    model: String,
    dimension: usize,
    entries: Vec<IndexEntry>,
}

impl IndexSnapshot {
    /// Pair chunk texts with their embedding vectors.
    ///
    /// Counts must match and every vector must have the same dimension.
    /// Building never touches the published index, so a failure here
    /// leaves the previous generation authoritative.
    pub fn build(
        texts: Vec<String>,
        embeddings: Vec<Vec<f32>>,
        model: impl Into<String>,
    ) -> Result<Self, IndexError> {
        if texts.len() != embeddings.len() {
            return Err(IndexError::LengthMismatch {
                chunks: texts.len(),
                embeddings: embeddings.len(),
            });
        }
        if texts.is_empty() {
            return Err(IndexError::Empty);
        }

        let dimension = embeddings[0].len();
        for (at, embedding) in embeddings.iter().enumerate() {
            if embedding.len() != dimension {
                return Err(IndexError::DimensionMismatch {
                    expected: dimension,
                    got: embedding.len(),
                    at,
                });
            }
        }

        let entries = texts
            .into_iter()
            .zip(embeddings)
            .map(|(text, embedding)| IndexEntry { text, embedding })
            .collect::<Vec<_>>();

        debug!(chunks = entries.len(), dimension, "Index snapshot built");

        Ok(Self {
            id: Uuid::new_v4(),
            built_at: Utc::now(),
            model: model.into(),
            dimension,
            entries,
        })
    }

    /// Top-k chunks by cosine similarity against `query`.
    ///
    /// Results are ordered by descending score; exact ties keep
    /// insertion order (the earlier chunk wins). Returns all chunks
    /// when `k` exceeds the snapshot size.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<ScoredChunk> {
        let mut scored: Vec<ScoredChunk> = self
            .entries
            .iter()
            .enumerate()
            .map(|(index, entry)| ScoredChunk {
                index,
                text: entry.text.clone(),
                score: cosine_similarity(query, &entry.embedding),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.index.cmp(&b.index))
        });
        scored.truncate(k);
        scored
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// Embedding model name captured at build time. Query embeddings
    /// must use the same model so similarities are comparable.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cosine similarity between two vectors. Zero-norm or
/// length-mismatched operands score 0.0 rather than NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
