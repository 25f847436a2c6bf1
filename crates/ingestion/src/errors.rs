//! Ingestion error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("PDF parse error: {message}")]
    PdfParse { message: String },

    #[error("No text content could be extracted from the document")]
    EmptyDocument,

    #[error("Chunking error: {0}")]
    Chunking(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
