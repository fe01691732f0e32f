//! Chunk model and error definitions for the parsing pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while configuring the word-window chunker.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkingError {
    /// A zero-word window can never make progress.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// The overlap would keep the window from advancing.
    #[error("chunk overlap ({chunk_overlap}) must be smaller than chunk size ({chunk_size})")]
    OverlapTooLarge {
        /// Configured window size in words.
        chunk_size: usize,
        /// Configured overlap in words.
        chunk_overlap: usize,
    },
}

/// Errors raised while turning a file into chunks.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The requested path does not exist.
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),
    /// A directory scan was requested for something that is not a directory.
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    /// Reading the file failed.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The file exists but its contents could not be decoded.
    #[error("Failed to parse {}: {reason}", path.display())]
    Malformed {
        /// File being parsed.
        path: PathBuf,
        /// Extractor diagnostic.
        reason: String,
    },
    /// The file cannot be handled by any extractor.
    #[error("Unsupported document {}: {reason}", path.display())]
    Unsupported {
        /// File being parsed.
        path: PathBuf,
        /// Why the file was rejected.
        reason: String,
    },
}

impl ParseError {
    /// Whether the failure is a missing input rather than a parse failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Document family recorded in chunk metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FileType {
    /// Paged PDF document.
    Pdf,
    /// Word-processing document (`.docx`, `.doc`).
    Docx,
    /// Plain UTF-8 text.
    Txt,
    /// Anything handled by the structure-aware extractor, labelled by extension.
    Other(String),
}

impl FileType {
    /// Lowercase label stored in the index.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Txt => "txt",
            Self::Other(label) => label,
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for FileType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pdf" => Self::Pdf,
            "docx" => Self::Docx,
            "txt" => Self::Txt,
            _ => Self::Other(value),
        }
    }
}

impl From<FileType> for String {
    fn from(value: FileType) -> Self {
        value.as_str().to_string()
    }
}

/// Provenance attached to every chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Path the chunk was read from, as given to the parser.
    pub source: String,
    /// Zero-based position of the chunk within its document.
    pub chunk_id: usize,
    /// Document family.
    pub file_type: FileType,
    /// Page count for paged documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<usize>,
    /// Paragraph count for paragraph-structured documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_paragraphs: Option<usize>,
    /// Leading structural element of a section from the structure-aware extractor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_type: Option<String>,
}

/// A bounded span of document text plus its provenance; the unit of retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk text, never blank.
    pub content: String,
    /// Provenance metadata.
    pub metadata: ChunkMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn file_type_serializes_as_label() {
        assert_eq!(serde_json::to_value(FileType::Pdf).unwrap(), json!("pdf"));
        assert_eq!(
            serde_json::to_value(FileType::Other("md".into())).unwrap(),
            json!("md")
        );
        let parsed: FileType = serde_json::from_value(json!("docx")).unwrap();
        assert_eq!(parsed, FileType::Docx);
    }

    #[test]
    fn metadata_omits_absent_extras() {
        let metadata = ChunkMetadata {
            source: "docs/a.txt".into(),
            chunk_id: 3,
            file_type: FileType::Txt,
            total_pages: None,
            total_paragraphs: None,
            element_type: None,
        };
        assert_eq!(
            serde_json::to_value(&metadata).unwrap(),
            json!({ "source": "docs/a.txt", "chunk_id": 3, "file_type": "txt" })
        );
    }

    #[test]
    fn not_found_is_distinguished_from_parse_failures() {
        assert!(ParseError::NotFound("missing.txt".into()).is_not_found());
        assert!(
            !ParseError::Malformed {
                path: "bad.pdf".into(),
                reason: "broken xref".into(),
            }
            .is_not_found()
        );
    }
}
