//! Ingestion pipeline: parse documents, embed their chunks, and report the outcome.

mod service;
pub mod types;

pub use service::{DocumentProcessor, connect_index};
pub use types::{FailedFile, IngestionReport, IngestionScope, ProcessingError};
