//! DocChat ingestion library
//!
//! Turns an uploaded PDF into retrieval units:
//! - PDF text extraction (one cleaned block per page)
//! - Fixed-stride character chunking with overlap

pub mod chunker;
pub mod errors;
pub mod pdf;

pub use chunker::{chunk_text, ChunkingConfig, TextChunk};
pub use errors::IngestionError;
pub use pdf::{extract_document, extract_document_from_path};
