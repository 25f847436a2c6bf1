//! Configuration management for the DocChat service
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/<env>, config/local)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Chunking configuration
    #[serde(default)]
    pub chunking: ChunkingSettings,

    /// OpenAI provider configuration
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Maximum accepted upload size in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChunkingSettings {
    /// Target chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in characters
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpenAiConfig {
    /// API base URL (override for custom endpoints and tests)
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Default model for the direct chat endpoint
    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    /// Model used for retrieval-augmented answers
    #[serde(default = "default_rag_chat_model")]
    pub rag_chat_model: String,

    /// Embedding model
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Per-request embedding timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub embedding_timeout_secs: u64,

    /// Inputs per embedding API request
    #[serde(default = "default_embedding_batch_size")]
    pub embedding_batch_size: usize,

    /// Embedding requests in flight at once during a build
    #[serde(default = "default_embedding_concurrency")]
    pub embedding_concurrency: usize,

    /// Upper bound on the embedding phase of one index build, seconds
    #[serde(default = "default_build_timeout")]
    pub build_timeout_secs: u64,

    /// Connect timeout for chat completion requests, seconds
    #[serde(default = "default_chat_connect_timeout")]
    pub chat_connect_timeout_secs: u64,

    /// Total timeout for non-streaming chat completions, seconds
    #[serde(default = "default_chat_timeout")]
    pub chat_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Prometheus exporter port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8000 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_max_upload_bytes() -> usize { 50 * 1024 * 1024 }
fn default_chunk_size() -> usize { 1000 }
fn default_chunk_overlap() -> usize { 200 }
fn default_api_base() -> String { "https://api.openai.com/v1".to_string() }
fn default_chat_model() -> String { crate::DEFAULT_CHAT_MODEL.to_string() }
fn default_rag_chat_model() -> String { crate::DEFAULT_RAG_CHAT_MODEL.to_string() }
fn default_embedding_model() -> String { crate::DEFAULT_EMBEDDING_MODEL.to_string() }
fn default_embedding_timeout() -> u64 { 30 }
fn default_embedding_batch_size() -> usize { 100 }
fn default_embedding_concurrency() -> usize { 4 }
fn default_build_timeout() -> u64 { 120 }
fn default_chat_connect_timeout() -> u64 { 10 }
fn default_chat_timeout() -> u64 { 60 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=8001
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }

    /// Get per-request embedding timeout as Duration
    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_secs(self.openai.embedding_timeout_secs)
    }

    /// Get whole-build embedding timeout as Duration
    pub fn build_timeout(&self) -> Duration {
        Duration::from_secs(self.openai.build_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            chat_model: default_chat_model(),
            rag_chat_model: default_rag_chat_model(),
            embedding_model: default_embedding_model(),
            embedding_timeout_secs: default_embedding_timeout(),
            embedding_batch_size: default_embedding_batch_size(),
            embedding_concurrency: default_embedding_concurrency(),
            build_timeout_secs: default_build_timeout(),
            chat_connect_timeout_secs: default_chat_connect_timeout(),
            chat_timeout_secs: default_chat_timeout(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            chunking: ChunkingSettings::default(),
            openai: OpenAiConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}
