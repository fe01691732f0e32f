//! Embedding-aware index client: embeds chunks and queries, then talks to a vector store.

use std::sync::Arc;

use super::filters::MetadataFilter;
use super::ids::{build_metadata, vector_id};
use super::store::VectorStore;
use super::types::{
    IndexError, IndexSpec, IndexStats, SearchError, SearchResult, UpsertSummary, VectorRecord,
};
use crate::embedding::{EmbeddingClient, EmbeddingClientError};
use crate::parser::Chunk;

/// Settings binding an [`EmbeddingIndexClient`] to one index.
#[derive(Debug, Clone)]
pub struct IndexClientSettings {
    /// Index every operation targets.
    pub index_name: String,
    /// Expected embedding length.
    pub dimension: usize,
    /// Characters of chunk text kept in stored metadata.
    pub metadata_content_limit: usize,
}

/// Embeds chunks and queries, and stores or retrieves them through a [`VectorStore`].
#[derive(Clone)]
pub struct EmbeddingIndexClient {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingClient + Send + Sync>,
    settings: IndexClientSettings,
}

impl EmbeddingIndexClient {
    /// Wire a store and an embedding client together for one index.
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingClient + Send + Sync>,
        settings: IndexClientSettings,
    ) -> Self {
        Self {
            store,
            embedder,
            settings,
        }
    }

    /// Name of the index this client reads and writes.
    pub fn index_name(&self) -> &str {
        &self.settings.index_name
    }

    /// Create the index described by `spec` unless it already exists.
    ///
    /// Returns `true` when the index was created by this call.
    pub async fn ensure_index(&self, spec: &IndexSpec) -> Result<bool, IndexError> {
        let existing = self.store.list_indexes().await?;
        if existing.iter().any(|name| *name == spec.name) {
            tracing::debug!(index = %spec.name, "Index already present");
            return Ok(false);
        }

        tracing::info!(
            index = %spec.name,
            dimension = spec.dimension,
            metric = %spec.metric,
            "Creating index"
        );
        self.store.create_index(spec).await?;
        Ok(true)
    }

    /// Embed and store `chunks` in batches of `batch_size`.
    ///
    /// Blank chunks are ignored. A chunk whose embedding fails, or has the wrong length, is
    /// counted as failed and left out of its batch. A batch the store rejects counts every one
    /// of its vectors as failed; later batches are still submitted.
    pub async fn upsert(&self, chunks: &[Chunk], batch_size: usize) -> UpsertSummary {
        let mut summary = UpsertSummary::default();
        let mut records = Vec::new();

        for chunk in chunks {
            if chunk.content.trim().is_empty() {
                continue;
            }
            summary.total += 1;

            match self.embed_one(&chunk.content).await {
                Ok(values) => records.push(VectorRecord {
                    id: vector_id(
                        &chunk.metadata.source,
                        chunk.metadata.chunk_id,
                        &chunk.content,
                    ),
                    values,
                    metadata: build_metadata(chunk, self.settings.metadata_content_limit),
                }),
                Err(err) => {
                    summary.failed += 1;
                    tracing::error!(
                        source = %chunk.metadata.source,
                        chunk_id = chunk.metadata.chunk_id,
                        error = %err,
                        "Failed to embed chunk"
                    );
                }
            }
        }

        let batch_size = batch_size.max(1);
        let mut batches = Vec::new();
        while !records.is_empty() {
            let rest = records.split_off(batch_size.min(records.len()));
            batches.push(std::mem::replace(&mut records, rest));
        }

        for (number, batch) in batches.into_iter().enumerate() {
            let size = batch.len();
            match self.store.upsert(&self.settings.index_name, batch).await {
                Ok(_) => {
                    summary.upserted += size;
                    tracing::debug!(batch = number + 1, vectors = size, "Upserted batch");
                }
                Err(err) => {
                    summary.failed += size;
                    tracing::error!(
                        batch = number + 1,
                        vectors = size,
                        error = %err,
                        "Failed to upsert batch"
                    );
                }
            }
        }

        tracing::info!(
            index = %self.settings.index_name,
            upserted = summary.upserted,
            failed = summary.failed,
            total = summary.total,
            "Upsert finished"
        );
        summary
    }

    /// Top `top_k` stored chunks closest to `query`, best first.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchResult>, SearchError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let vector = self.embed_one(query).await?;
        let matches = self
            .store
            .query(&self.settings.index_name, vector, top_k, filter)
            .await?;

        let mut results: Vec<SearchResult> =
            matches.into_iter().map(SearchResult::from_match).collect();
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(top_k);

        tracing::debug!(
            index = %self.settings.index_name,
            results = results.len(),
            "Search complete"
        );
        Ok(results)
    }

    /// Remove every vector whose `source` equals `source`.
    ///
    /// Returns whether the store call completed without error.
    pub async fn delete_by_source(&self, source: &str) -> bool {
        match self
            .store
            .delete(&self.settings.index_name, &MetadataFilter::source(source))
            .await
        {
            Ok(()) => {
                tracing::info!(
                    source,
                    index = %self.settings.index_name,
                    "Deleted vectors by source"
                );
                true
            }
            Err(err) => {
                tracing::error!(source, error = %err, "Failed to delete vectors by source");
                false
            }
        }
    }

    /// Read-only statistics for the bound index.
    pub async fn get_stats(&self) -> Result<IndexStats, IndexError> {
        self.store.describe_stats(&self.settings.index_name).await
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError> {
        let mut vectors = self.embedder.generate_embeddings(vec![text.to_string()]).await?;
        let values = vectors.pop().ok_or_else(|| {
            EmbeddingClientError::GenerationFailed("provider returned no embedding".into())
        })?;
        if values.len() != self.settings.dimension {
            return Err(EmbeddingClientError::DimensionMismatch {
                expected: self.settings.dimension,
                actual: values.len(),
            });
        }
        Ok(values)
    }
}
