//! Answer and citation types returned to callers.

use serde::Serialize;

use crate::index::SearchResult;

/// Where a piece of retrieved evidence came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceCitation {
    /// Document path.
    pub source: String,
    /// Similarity score of the chunk.
    pub score: f32,
    /// Chunk position within the document, when known.
    pub chunk_id: Option<u64>,
}

impl From<&SearchResult> for SourceCitation {
    fn from(result: &SearchResult) -> Self {
        Self {
            source: result.source().to_string(),
            score: result.score,
            chunk_id: result.chunk_id(),
        }
    }
}

/// Answer to one chat turn, with the evidence it was generated from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatResult {
    /// Question as asked.
    pub query: String,
    /// Generated answer, or a fixed message when nothing relevant was found.
    pub response: String,
    /// Retrieved chunks in relevance order.
    pub sources: Vec<SourceCitation>,
    /// Context block handed to the model.
    pub context_used: String,
}

impl ChatResult {
    /// A turn answered with a fixed message and no supporting documents.
    pub fn unanswered(query: &str, response: String) -> Self {
        Self {
            query: query.to_string(),
            response,
            sources: Vec::new(),
            context_used: String::new(),
        }
    }
}
