use crate::config::{Config, ConfigError, EmbeddingProvider};
use crate::openai::ApiError;
use async_trait::async_trait;
use thiserror::Error;

mod hashing;
mod openai;

pub use hashing::HashingEmbeddingClient;
pub use openai::OpenAiEmbeddingClient;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// Provider was unable to produce embeddings for the supplied input.
    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),
    /// The remote embedding service call failed.
    #[error(transparent)]
    Request(#[from] ApiError),
    /// A vector came back with a different length than the index expects.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Configured dimensionality.
        expected: usize,
        /// Length of the returned vector.
        actual: usize,
    },
}

impl EmbeddingClientError {
    /// Whether repeating the call could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(err) => err.is_retryable(),
            Self::GenerationFailed(_) | Self::DimensionMismatch { .. } => false,
        }
    }
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient {
    /// Produce an embedding vector for each supplied chunk of text, in input order.
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError>;
}

/// Build the embedding client selected by the configuration.
pub fn build_embedding_client(
    config: &Config,
) -> Result<Box<dyn EmbeddingClient + Send + Sync>, ConfigError> {
    match config.embedding_provider {
        EmbeddingProvider::OpenAI => {
            let client = OpenAiEmbeddingClient::new(
                &config.openai_settings()?,
                config.embedding_model.clone(),
            )
            .map_err(|err| ConfigError::InvalidValue {
                key: "OPENAI_BASE_URL".into(),
                reason: err.to_string(),
            })?;
            Ok(Box::new(client))
        }
        EmbeddingProvider::Hashing => Ok(Box::new(HashingEmbeddingClient::new(
            config.embedding_dimension,
        ))),
    }
}
