//! DocChat Common Library
//!
//! Shared code for the DocChat service:
//! - Configuration management
//! - Error types and HTTP mapping
//! - Provider credential handling
//! - OpenAI embedding and chat clients
//! - Metrics helpers

pub mod auth;
pub mod chat;
pub mod config;
pub mod embeddings;
pub mod errors;
pub mod metrics;

// Re-export commonly used types
pub use auth::ApiKey;
pub use config::AppConfig;
pub use embeddings::Embedder;
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default chat model for the direct chat endpoint
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4.1-mini";

/// Default chat model for retrieval-augmented answers
pub const DEFAULT_RAG_CHAT_MODEL: &str = "gpt-4o-mini";

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
