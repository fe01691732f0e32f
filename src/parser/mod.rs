//! Document parsing: format dispatch, text extraction, and word-window chunking.

pub mod chunking;
pub mod extract;
mod service;
pub mod structured;
pub mod types;

pub use chunking::WordChunker;
pub use extract::{
    ExtractedBody, ExtractedDocument, FileFormat, PdfPageExtractor, pdf_extract_pages,
};
pub use service::{
    DEFAULT_EXTENSIONS, DirectoryScan, DocumentParser, FileOutcome, default_extensions,
};
pub use types::{Chunk, ChunkMetadata, ChunkingError, FileType, ParseError};
