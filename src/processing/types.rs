//! Report types and error definitions for the ingestion pipeline.

use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::index::IndexError;
use crate::parser::{ChunkingError, ParseError};

/// Errors raised while assembling the ingestion pipeline.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// Configuration was missing or inconsistent.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Chunk settings were rejected.
    #[error("Invalid chunking configuration: {0}")]
    Chunking(#[from] ChunkingError),
    /// Input could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// The vector index could not be reached or prepared.
    #[error("Index request failed: {0}")]
    Index(#[from] IndexError),
}

/// What an ingestion call covered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestionScope {
    /// A single document.
    File,
    /// Every matching document under a directory.
    Directory,
}

/// A document skipped during a directory ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedFile {
    /// Path of the skipped document.
    pub path: String,
    /// Why it was skipped.
    pub error: String,
}

/// Structured result of one ingestion call; failures are reported here rather than raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestionReport {
    /// Whether a file or a directory was ingested.
    pub scope: IngestionScope,
    /// File or directory path given by the caller.
    pub path: String,
    /// Chunks produced by the parser.
    pub chunks_parsed: usize,
    /// Vectors accepted by the index.
    pub vectors_upserted: usize,
    /// Chunks whose embedding or batch failed.
    pub vectors_failed: usize,
    /// Documents parsed successfully (directory scans only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files_parsed: Option<usize>,
    /// Documents skipped because they failed to parse (directory scans only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files_failed: Option<usize>,
    /// Skipped documents and their errors.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_files: Vec<FailedFile>,
    /// `false` when the call as a whole could not run.
    pub success: bool,
    /// Reason for an unsuccessful call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IngestionReport {
    /// Empty successful report for `path`.
    pub fn new(scope: IngestionScope, path: impl Into<String>) -> Self {
        Self {
            scope,
            path: path.into(),
            chunks_parsed: 0,
            vectors_upserted: 0,
            vectors_failed: 0,
            files_parsed: None,
            files_failed: None,
            failed_files: Vec::new(),
            success: true,
            error: None,
        }
    }

    /// Unsuccessful report carrying `error`.
    pub fn failed(scope: IngestionScope, path: impl Into<String>, error: impl ToString) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            ..Self::new(scope, path)
        }
    }
}
