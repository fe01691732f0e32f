#![deny(missing_docs)]

//! Core library for the docchat document ingestion and question answering tools.

/// Retrieval-augmented answering over indexed documents.
pub mod chat;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Output rendering for the command line tools.
pub mod format;
/// Completion client abstraction and the OpenAI chat adapter.
pub mod generation;
/// Vector index integration: stores, ids, filters and the embedding index client.
pub mod index;
/// Structured logging and tracing setup.
pub mod logging;
/// Shared HTTP transport for OpenAI-compatible services.
pub mod openai;
/// Document parsing and chunking.
pub mod parser;
/// Ingestion pipeline wiring parser output into the index.
pub mod processing;
