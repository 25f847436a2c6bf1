//! Error types for the DocChat service
//!
//! Every failure is caught at the request boundary and converted to a
//! structured `{"error": message}` response with an HTTP status:
//! precondition violations (bad request body, querying before any
//! index exists) map to 400, everything else to 500. Nothing is
//! retried automatically.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Machine-readable error identification, used in logs and metrics
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    NotIndexed,
    ExtractionError,
    EmbeddingError,
    EmbeddingTimeout,
    ChatError,
    UpstreamError,
    SerializationError,
    ConfigurationError,
    InternalError,
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("No PDF indexed. Please upload a PDF first.")]
    NotIndexed,

    #[error("PDF extraction failed: {message}")]
    Extraction { message: String },

    #[error("Embedding service error: {message}")]
    Embedding { message: String },

    #[error("Embedding timed out after {timeout_ms}ms")]
    EmbeddingTimeout { timeout_ms: u64 },

    #[error("Chat completion error: {message}")]
    Chat { message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::NotIndexed => ErrorCode::NotIndexed,
            AppError::Extraction { .. } => ErrorCode::ExtractionError,
            AppError::Embedding { .. } => ErrorCode::EmbeddingError,
            AppError::EmbeddingTimeout { .. } => ErrorCode::EmbeddingTimeout,
            AppError::Chat { .. } => ErrorCode::ChatError,
            AppError::HttpClient(_) => ErrorCode::UpstreamError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Internal { .. } | AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request: precondition violations, rejected before
            // any remote call
            AppError::Validation { .. } | AppError::NotIndexed => StatusCode::BAD_REQUEST,

            // 500 Internal Server Error: extraction, provider, and
            // unexpected failures
            AppError::Extraction { .. }
            | AppError::Embedding { .. }
            | AppError::EmbeddingTimeout { .. }
            | AppError::Chat { .. }
            | AppError::HttpClient(_)
            | AppError::Serialization(_)
            | AppError::Configuration { .. }
            | AppError::Internal { .. }
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Wire shape of error responses
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_index_is_a_client_error() {
        let err = AppError::NotIndexed;
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), ErrorCode::NotIndexed);
        assert!(err.is_client_error());
        assert!(err.to_string().contains("No PDF indexed"));
    }

    #[test]
    fn validation_error_maps_to_400() {
        let err = AppError::Validation {
            message: "user_message must not be empty".into(),
            field: Some("user_message".into()),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_server_error());
    }

    #[test]
    fn provider_failures_map_to_500() {
        let err = AppError::Embedding {
            message: "API error 401: invalid key".into(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.is_server_error());

        let err = AppError::Chat {
            message: "connection reset".into(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn error_response_shape_is_flat() {
        let body = serde_json::to_value(ErrorResponse {
            error: "boom".into(),
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"error": "boom"}));
    }
}
