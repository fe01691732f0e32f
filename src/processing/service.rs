//! Ingestion orchestrator coordinating parsing, embedding, and index writes.

use std::path::Path;
use std::sync::Arc;

use crate::{
    config::Config,
    embedding::build_embedding_client,
    index::{
        EmbeddingIndexClient, IndexClientSettings, IndexError, IndexStats, MetadataFilter,
        PineconeStore, SearchError, SearchResult,
    },
    parser::{DocumentParser, ParseError, default_extensions},
    processing::types::{FailedFile, IngestionReport, IngestionScope, ProcessingError},
};

/// Build an index client for `index_name` against the configured services and make sure the
/// index exists.
pub async fn connect_index(
    config: &Config,
    index_name: &str,
) -> Result<EmbeddingIndexClient, ProcessingError> {
    let store = PineconeStore::new(&config.pinecone_settings())?;
    let embedder = build_embedding_client(config)?;
    let client = EmbeddingIndexClient::new(
        Arc::new(store),
        Arc::from(embedder),
        IndexClientSettings {
            index_name: index_name.to_string(),
            dimension: config.embedding_dimension,
            metadata_content_limit: config.metadata_content_limit,
        },
    );
    client.ensure_index(&config.index_spec(index_name)).await?;
    Ok(client)
}

/// Runs parser output through the index client and reports the outcome as data.
///
/// Every ingestion call returns an [`IngestionReport`]; errors are folded into the report so
/// directory runs always produce a result even under partial failure.
pub struct DocumentProcessor {
    parser: DocumentParser,
    index: EmbeddingIndexClient,
    batch_size: usize,
}

impl DocumentProcessor {
    /// Wire a parser and an index client together.
    pub fn new(parser: DocumentParser, index: EmbeddingIndexClient, batch_size: usize) -> Self {
        Self {
            parser,
            index,
            batch_size: batch_size.max(1),
        }
    }

    /// Build a processor from configuration, connecting to the configured index services.
    pub async fn from_config(config: &Config, index_name: &str) -> Result<Self, ProcessingError> {
        let parser = DocumentParser::new(config.chunk_size, config.chunk_overlap)?;
        let index = connect_index(config, index_name).await?;
        tracing::info!(index = index_name, "Document processor ready");
        Ok(Self::new(parser, index, config.upsert_batch_size))
    }

    /// Index client used by this processor.
    pub fn index(&self) -> &EmbeddingIndexClient {
        &self.index
    }

    /// Parse and index one document.
    pub async fn process_single_file(&self, path: &Path) -> IngestionReport {
        let shown = path.to_string_lossy().into_owned();
        tracing::info!(path = %shown, "Processing file");

        let parsed = self
            .run_parser(path, |parser, path| parser.parse_document(path))
            .await;
        let chunks = match parsed {
            Ok(chunks) => chunks,
            Err(err) => {
                tracing::error!(path = %shown, error = %err, "Failed to process file");
                return IngestionReport::failed(IngestionScope::File, shown, err);
            }
        };

        let summary = self.index.upsert(&chunks, self.batch_size).await;
        IngestionReport {
            chunks_parsed: chunks.len(),
            vectors_upserted: summary.upserted,
            vectors_failed: summary.failed,
            ..IngestionReport::new(IngestionScope::File, shown)
        }
    }

    /// Parse and index every matching document under `dir`.
    ///
    /// `extensions` defaults to the parser's standard list. Documents that fail to parse are
    /// skipped and listed in the report.
    pub async fn process_directory(
        &self,
        dir: &Path,
        extensions: Option<&[String]>,
    ) -> IngestionReport {
        let shown = dir.to_string_lossy().into_owned();
        tracing::info!(directory = %shown, "Processing directory");

        let defaults;
        let extensions = match extensions {
            Some(extensions) if !extensions.is_empty() => extensions,
            _ => {
                defaults = default_extensions();
                &defaults
            }
        };

        let extensions = extensions.to_vec();
        let scanned = self
            .run_parser(dir, move |parser, dir| parser.scan_directory(dir, &extensions))
            .await;
        let scan = match scanned {
            Ok(scan) => scan,
            Err(err) => {
                tracing::error!(directory = %shown, error = %err, "Failed to process directory");
                return IngestionReport::failed(IngestionScope::Directory, shown, err);
            }
        };

        let files_parsed = scan.parsed();
        let failed_files: Vec<FailedFile> = scan
            .failures()
            .map(|(path, err)| FailedFile {
                path: path.to_string_lossy().into_owned(),
                error: err.to_string(),
            })
            .collect();
        let chunks = scan.into_chunks();
        let summary = self.index.upsert(&chunks, self.batch_size).await;

        tracing::info!(
            directory = %shown,
            files = files_parsed,
            skipped = failed_files.len(),
            chunks = chunks.len(),
            upserted = summary.upserted,
            "Directory processed"
        );

        IngestionReport {
            chunks_parsed: chunks.len(),
            vectors_upserted: summary.upserted,
            vectors_failed: summary.failed,
            files_parsed: Some(files_parsed),
            files_failed: Some(failed_files.len()),
            failed_files,
            ..IngestionReport::new(IngestionScope::Directory, shown)
        }
    }

    /// Run a parsing job on the blocking pool so extraction never stalls the runtime.
    ///
    /// A job that dies with a panic is reported as a malformed document at `path`.
    async fn run_parser<T, F>(&self, path: &Path, job: F) -> Result<T, ParseError>
    where
        T: Send + 'static,
        F: FnOnce(&DocumentParser, &Path) -> Result<T, ParseError> + Send + 'static,
    {
        let parser = self.parser.clone();
        let owned = path.to_path_buf();
        match tokio::task::spawn_blocking(move || job(&parser, &owned)).await {
            Ok(result) => result,
            Err(err) => Err(ParseError::Malformed {
                path: path.to_path_buf(),
                reason: format!("parser task failed: {err}"),
            }),
        }
    }

    /// Similarity search, optionally restricted to one source document.
    pub async fn search_documents(
        &self,
        query: &str,
        top_k: usize,
        source_filter: Option<&str>,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let filter = source_filter.map(MetadataFilter::source);
        self.index.search(query, top_k, filter.as_ref()).await
    }

    /// Remove every vector ingested from `path`.
    pub async fn delete_document(&self, path: &str) -> bool {
        self.index.delete_by_source(path).await
    }

    /// Statistics for the bound index.
    pub async fn get_database_stats(&self) -> Result<IndexStats, IndexError> {
        self.index.get_stats().await
    }
}
