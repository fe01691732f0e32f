//! Shared types used by the vector stores and the index client.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::embedding::EmbeddingClientError;

/// Errors returned while interacting with a vector store.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Base URL or data-plane host failed to parse.
    #[error("Invalid index URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),
    /// The request exceeded the configured timeout.
    #[error("Index request timed out after {0:?}")]
    Timeout(Duration),
    /// The store responded with an unexpected status code.
    #[error("Unexpected index response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the store.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// The named index does not exist.
    #[error("Index not found: {0}")]
    IndexNotFound(String),
    /// The response body did not have the expected shape.
    #[error("Invalid index response: {0}")]
    InvalidResponse(String),
    /// The store refused the request contents.
    #[error("Index rejected request: {0}")]
    Rejected(String),
}

impl IndexError {
    /// Whether repeating the call could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(err) => err.is_connect() || err.is_request(),
            Self::Timeout(_) => true,
            Self::UnexpectedStatus { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            Self::InvalidUrl(_)
            | Self::IndexNotFound(_)
            | Self::InvalidResponse(_)
            | Self::Rejected(_) => false,
        }
    }
}

/// Failures surfaced by search and introspection calls on the index client.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The query text could not be embedded.
    #[error("Failed to embed query: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// The backing store failed.
    #[error(transparent)]
    Index(#[from] IndexError),
}

impl SearchError {
    /// Whether repeating the call could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Embedding(err) => err.is_retryable(),
            Self::Index(err) => err.is_retryable(),
        }
    }
}

/// Similarity metric an index is created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Cosine similarity.
    Cosine,
    /// Euclidean distance.
    Euclidean,
    /// Raw inner product.
    #[serde(rename = "dotproduct")]
    DotProduct,
}

impl DistanceMetric {
    /// Name used by the index service.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::Euclidean => "euclidean",
            Self::DotProduct => "dotproduct",
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceMetric {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "euclidean" => Ok(Self::Euclidean),
            "dotproduct" | "dot_product" | "dot" => Ok(Self::DotProduct),
            _ => Err(()),
        }
    }
}

/// Layout of an index: its name, vector length, and similarity metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    /// Index name.
    pub name: String,
    /// Vector dimensionality.
    pub dimension: usize,
    /// Similarity metric.
    pub metric: DistanceMetric,
}

/// A vector ready for storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Deterministic identifier.
    pub id: String,
    /// Embedding values.
    pub values: Vec<f32>,
    /// Chunk metadata plus truncated content.
    pub metadata: Map<String, Value>,
}

/// Scored match returned by a store query, in store order.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueryMatch {
    /// Vector identifier.
    pub id: String,
    /// Similarity score.
    #[serde(default)]
    pub score: f32,
    /// Stored metadata, when requested.
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

/// Per-namespace vector count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceStats {
    /// Vectors stored in the namespace.
    #[serde(default)]
    pub vector_count: u64,
}

/// Read-only statistics describing an index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    /// Total vectors across namespaces.
    #[serde(default)]
    pub total_vector_count: u64,
    /// Vector dimensionality.
    #[serde(default)]
    pub dimension: usize,
    /// Fraction of capacity used, when the service reports it.
    #[serde(default)]
    pub index_fullness: f32,
    /// Counts keyed by namespace name.
    #[serde(default)]
    pub namespaces: std::collections::BTreeMap<String, NamespaceStats>,
}

/// Aggregate outcome of an upsert call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertSummary {
    /// Vectors accepted by the store.
    pub upserted: usize,
    /// Chunks whose embedding or batch failed.
    pub failed: usize,
    /// Chunks considered (non-blank content).
    pub total: usize,
}

/// A stored chunk matched by a similarity search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    /// Vector identifier.
    pub id: String,
    /// Similarity score.
    pub score: f32,
    /// Stored (possibly truncated) chunk text.
    pub content: String,
    /// Stored metadata including `source` and `chunk_id`.
    pub metadata: Map<String, Value>,
}

impl SearchResult {
    /// Build a result from a store match, lifting `content` out of the metadata.
    pub fn from_match(matched: QueryMatch) -> Self {
        let metadata = matched.metadata.unwrap_or_default();
        let content = metadata
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Self {
            id: matched.id,
            score: matched.score,
            content,
            metadata,
        }
    }

    /// Path of the document the chunk came from, or `Unknown`.
    pub fn source(&self) -> &str {
        self.metadata
            .get("source")
            .and_then(Value::as_str)
            .unwrap_or("Unknown")
    }

    /// Chunk position within its document, when recorded.
    ///
    /// Stores that keep numbers as floats report `chunk_id` as e.g. `3.0`.
    pub fn chunk_id(&self) -> Option<u64> {
        let value = self.metadata.get("chunk_id")?;
        value.as_u64().or_else(|| {
            value
                .as_f64()
                .filter(|number| *number >= 0.0 && number.fract() == 0.0)
                .map(|number| number as u64)
        })
    }
}
