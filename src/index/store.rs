//! Storage seam between the index client and a concrete vector database.

use async_trait::async_trait;

use super::filters::MetadataFilter;
use super::types::{IndexError, IndexSpec, IndexStats, QueryMatch, VectorRecord};

/// Backing service holding vectors, addressed by index name.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Names of every index the service knows about.
    async fn list_indexes(&self) -> Result<Vec<String>, IndexError>;

    /// Create an index with the given layout.
    async fn create_index(&self, spec: &IndexSpec) -> Result<(), IndexError>;

    /// Insert or overwrite records keyed by id, returning how many were accepted.
    async fn upsert(&self, index: &str, records: Vec<VectorRecord>) -> Result<usize, IndexError>;

    /// Nearest neighbours of `vector`, with metadata, in the store's ranking order.
    async fn query(
        &self,
        index: &str,
        vector: Vec<f32>,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<QueryMatch>, IndexError>;

    /// Remove every record whose metadata matches `filter`.
    async fn delete(&self, index: &str, filter: &MetadataFilter) -> Result<(), IndexError>;

    /// Read-only statistics for `index`.
    async fn describe_stats(&self, index: &str) -> Result<IndexStats, IndexError>;
}
