//! Vector index integration: store backends, ids, filters, and the embedding index client.

mod client;
pub mod filters;
pub mod ids;
mod memory;
mod pinecone;
mod store;
pub mod types;

pub use client::{EmbeddingIndexClient, IndexClientSettings};
pub use filters::MetadataFilter;
pub use ids::{build_metadata, compute_content_hash, vector_id};
pub use memory::InMemoryStore;
pub use pinecone::{PineconeSettings, PineconeStore};
pub use store::VectorStore;
pub use types::{
    DistanceMetric, IndexError, IndexSpec, IndexStats, NamespaceStats, QueryMatch, SearchError,
    SearchResult, UpsertSummary, VectorRecord,
};
