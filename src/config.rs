use crate::generation::CompletionSettings;
use crate::index::{DistanceMetric, IndexSpec, PineconeSettings};
use crate::openai::OpenAiSettings;
use serde::Serialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Index name used when `PINECONE_INDEX_NAME` is not provided.
pub const DEFAULT_INDEX_NAME: &str = "chatbot-docs";
const DEFAULT_PINECONE_CONTROLLER_URL: &str = "https://api.pinecone.io";
const DEFAULT_PINECONE_REGION: &str = "us-east-1";
const DEFAULT_PINECONE_CLOUD: &str = "aws";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
const DEFAULT_EMBEDDING_DIMENSION: usize = 1536;
const DEFAULT_COMPLETION_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_COMPLETION_MAX_TOKENS: u32 = 500;
const DEFAULT_COMPLETION_TEMPERATURE: f32 = 0.7;
const DEFAULT_CHUNK_SIZE: usize = 1000;
const DEFAULT_CHUNK_OVERLAP: usize = 200;
const DEFAULT_MAX_CONTEXT_CHUNKS: usize = 5;
const DEFAULT_UPSERT_BATCH_SIZE: usize = 100;
const DEFAULT_METADATA_CONTENT_LIMIT: usize = 1000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable {key}: {reason}")]
    InvalidValue {
        /// Variable name that failed validation.
        key: String,
        /// Human readable reason for the rejection.
        reason: String,
    },
    /// Chunk size and overlap would not advance the chunking window.
    #[error("Invalid chunking configuration: chunk_size={chunk_size}, chunk_overlap={chunk_overlap}")]
    InvalidChunking {
        /// Configured window size in words.
        chunk_size: usize,
        /// Configured overlap in words.
        chunk_overlap: usize,
    },
}

/// Supported embedding backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// OpenAI-compatible `/embeddings` endpoint.
    OpenAI,
    /// Deterministic local hashing, for offline runs and tests.
    Hashing,
}

impl FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "hashing" => Ok(Self::Hashing),
            _ => Err(()),
        }
    }
}

/// Runtime configuration shared by both command line tools.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pinecone API key.
    pub pinecone_api_key: String,
    /// Pinecone control-plane base URL.
    pub pinecone_controller_url: String,
    /// Cloud hint used when the index has to be created.
    pub pinecone_cloud: String,
    /// Region hint used when the index has to be created (`PINECONE_ENVIRONMENT`).
    pub pinecone_region: String,
    /// Name of the index holding document vectors.
    pub index_name: String,
    /// Similarity metric used when creating the index.
    pub distance_metric: DistanceMetric,
    /// API key for the embedding and completion service, when one is configured.
    pub openai_api_key: Option<String>,
    /// Base URL of the OpenAI-compatible API.
    pub openai_base_url: String,
    /// Embedding backend.
    pub embedding_provider: EmbeddingProvider,
    /// Embedding model identifier.
    pub embedding_model: String,
    /// Dimensionality every stored vector must have.
    pub embedding_dimension: usize,
    /// Chat completion model identifier.
    pub completion_model: String,
    /// Token cap for generated answers.
    pub completion_max_tokens: u32,
    /// Sampling temperature for generated answers.
    pub completion_temperature: f32,
    /// Chunk window size in words.
    pub chunk_size: usize,
    /// Words shared between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of search hits assembled into the chat context.
    pub max_context_chunks: usize,
    /// Vectors per upsert request.
    pub upsert_batch_size: usize,
    /// Characters of chunk content kept in vector metadata.
    pub metadata_content_limit: usize,
    /// Timeout applied to each outbound HTTP call.
    pub request_timeout: Duration,
}

impl Config {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup, validating along the way.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let embedding_provider = match vars.optional("EMBEDDING_PROVIDER") {
            Some(value) => {
                value
                    .parse::<EmbeddingProvider>()
                    .map_err(|()| ConfigError::InvalidValue {
                        key: "EMBEDDING_PROVIDER".into(),
                        reason: format!("unknown provider '{value}'"),
                    })?
            }
            None => EmbeddingProvider::OpenAI,
        };
        let distance_metric = match vars.optional("PINECONE_METRIC") {
            Some(value) => {
                value
                    .parse::<DistanceMetric>()
                    .map_err(|()| ConfigError::InvalidValue {
                        key: "PINECONE_METRIC".into(),
                        reason: format!("unknown metric '{value}'"),
                    })?
            }
            None => DistanceMetric::Cosine,
        };

        let request_timeout_secs = vars
            .parsed("REQUEST_TIMEOUT_SECS")?
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        let config = Self {
            pinecone_api_key: vars.required("PINECONE_API_KEY")?,
            pinecone_controller_url: vars
                .optional("PINECONE_CONTROLLER_URL")
                .unwrap_or_else(|| DEFAULT_PINECONE_CONTROLLER_URL.to_string()),
            pinecone_cloud: vars
                .optional("PINECONE_CLOUD")
                .unwrap_or_else(|| DEFAULT_PINECONE_CLOUD.to_string()),
            pinecone_region: vars
                .optional("PINECONE_ENVIRONMENT")
                .unwrap_or_else(|| DEFAULT_PINECONE_REGION.to_string()),
            index_name: vars
                .optional("PINECONE_INDEX_NAME")
                .unwrap_or_else(|| DEFAULT_INDEX_NAME.to_string()),
            distance_metric,
            openai_api_key: vars.optional("OPENAI_API_KEY"),
            openai_base_url: vars
                .optional("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            embedding_provider,
            embedding_model: vars
                .optional("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            embedding_dimension: vars
                .parsed("EMBEDDING_DIMENSION")?
                .unwrap_or(DEFAULT_EMBEDDING_DIMENSION),
            completion_model: vars
                .optional("COMPLETION_MODEL")
                .unwrap_or_else(|| DEFAULT_COMPLETION_MODEL.to_string()),
            completion_max_tokens: vars
                .parsed("COMPLETION_MAX_TOKENS")?
                .unwrap_or(DEFAULT_COMPLETION_MAX_TOKENS),
            completion_temperature: vars
                .parsed("COMPLETION_TEMPERATURE")?
                .unwrap_or(DEFAULT_COMPLETION_TEMPERATURE),
            chunk_size: vars.parsed("CHUNK_SIZE")?.unwrap_or(DEFAULT_CHUNK_SIZE),
            chunk_overlap: vars
                .parsed("CHUNK_OVERLAP")?
                .unwrap_or(DEFAULT_CHUNK_OVERLAP),
            max_context_chunks: vars
                .parsed("MAX_CONTEXT_CHUNKS")?
                .unwrap_or(DEFAULT_MAX_CONTEXT_CHUNKS),
            upsert_batch_size: vars
                .parsed("UPSERT_BATCH_SIZE")?
                .unwrap_or(DEFAULT_UPSERT_BATCH_SIZE),
            metadata_content_limit: vars
                .parsed("METADATA_CONTENT_LIMIT")?
                .unwrap_or(DEFAULT_METADATA_CONTENT_LIMIT),
            request_timeout: Duration::from_secs(request_timeout_secs),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject combinations that would make the pipeline misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 || self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::InvalidChunking {
                chunk_size: self.chunk_size,
                chunk_overlap: self.chunk_overlap,
            });
        }
        let positive: [(&str, bool); 5] = [
            ("EMBEDDING_DIMENSION", self.embedding_dimension > 0),
            ("MAX_CONTEXT_CHUNKS", self.max_context_chunks > 0),
            ("UPSERT_BATCH_SIZE", self.upsert_batch_size > 0),
            ("METADATA_CONTENT_LIMIT", self.metadata_content_limit > 0),
            ("REQUEST_TIMEOUT_SECS", !self.request_timeout.is_zero()),
        ];
        for (key, ok) in positive {
            if !ok {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    reason: "must be greater than zero".into(),
                });
            }
        }
        if self.embedding_provider == EmbeddingProvider::OpenAI && self.openai_api_key.is_none() {
            return Err(ConfigError::MissingVariable("OPENAI_API_KEY".into()));
        }
        Ok(())
    }

    /// API key for the completion service, failing when chat is requested without one.
    pub fn require_openai_api_key(&self) -> Result<&str, ConfigError> {
        self.openai_api_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingVariable("OPENAI_API_KEY".into()))
    }

    /// Connection settings for the OpenAI-compatible embedding and completion endpoints.
    pub fn openai_settings(&self) -> Result<OpenAiSettings, ConfigError> {
        Ok(OpenAiSettings {
            base_url: self.openai_base_url.clone(),
            api_key: self.require_openai_api_key()?.to_string(),
            timeout: self.request_timeout,
        })
    }

    /// Connection settings for the Pinecone control and data planes.
    pub fn pinecone_settings(&self) -> PineconeSettings {
        PineconeSettings {
            controller_url: self.pinecone_controller_url.clone(),
            api_key: self.pinecone_api_key.clone(),
            cloud: self.pinecone_cloud.clone(),
            region: self.pinecone_region.clone(),
            timeout: self.request_timeout,
        }
    }

    /// Generation parameters for chat completions.
    pub fn completion_settings(&self) -> CompletionSettings {
        CompletionSettings {
            model: self.completion_model.clone(),
            max_tokens: self.completion_max_tokens,
            temperature: self.completion_temperature,
        }
    }

    /// Index layout derived from the embedding configuration.
    pub fn index_spec(&self, name: &str) -> IndexSpec {
        IndexSpec {
            name: name.to_string(),
            dimension: self.embedding_dimension,
            metric: self.distance_metric,
        }
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
    }

    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn parsed<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key)
            .map(|value| {
                value.parse().map_err(|err: T::Err| ConfigError::InvalidValue {
                    key: key.to_string(),
                    reason: err.to_string(),
                })
            })
            .transpose()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;

    pub(crate) fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_credentials_are_set() {
        let config = Config::from_lookup(lookup_from(&[
            ("PINECONE_API_KEY", "pc-key"),
            ("OPENAI_API_KEY", "sk-key"),
        ]))
        .expect("config");

        assert_eq!(config.index_name, DEFAULT_INDEX_NAME);
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 200);
        assert_eq!(config.max_context_chunks, 5);
        assert_eq!(config.upsert_batch_size, 100);
        assert_eq!(config.embedding_dimension, 1536);
        assert_eq!(config.pinecone_region, "us-east-1");
        assert_eq!(config.distance_metric, DistanceMetric::Cosine);
        assert_eq!(config.embedding_provider, EmbeddingProvider::OpenAI);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn missing_pinecone_key_is_fatal() {
        let error = Config::from_lookup(lookup_from(&[("OPENAI_API_KEY", "sk")])).unwrap_err();
        assert!(matches!(error, ConfigError::MissingVariable(key) if key == "PINECONE_API_KEY"));
    }

    #[test]
    fn openai_key_is_required_for_openai_embeddings() {
        let error = Config::from_lookup(lookup_from(&[("PINECONE_API_KEY", "pc")])).unwrap_err();
        assert!(matches!(error, ConfigError::MissingVariable(key) if key == "OPENAI_API_KEY"));

        let config = Config::from_lookup(lookup_from(&[
            ("PINECONE_API_KEY", "pc"),
            ("EMBEDDING_PROVIDER", "hashing"),
        ]))
        .expect("hashing provider needs no key");
        assert!(config.require_openai_api_key().is_err());
    }

    #[test]
    fn overlap_not_smaller_than_size_is_rejected() {
        let error = Config::from_lookup(lookup_from(&[
            ("PINECONE_API_KEY", "pc"),
            ("OPENAI_API_KEY", "sk"),
            ("CHUNK_SIZE", "100"),
            ("CHUNK_OVERLAP", "100"),
        ]))
        .unwrap_err();
        assert!(matches!(
            error,
            ConfigError::InvalidChunking {
                chunk_size: 100,
                chunk_overlap: 100
            }
        ));
    }

    #[test]
    fn unparsable_numbers_name_the_variable() {
        let error = Config::from_lookup(lookup_from(&[
            ("PINECONE_API_KEY", "pc"),
            ("OPENAI_API_KEY", "sk"),
            ("MAX_CONTEXT_CHUNKS", "lots"),
        ]))
        .unwrap_err();
        assert!(
            matches!(error, ConfigError::InvalidValue { key, .. } if key == "MAX_CONTEXT_CHUNKS")
        );
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let error = Config::from_lookup(lookup_from(&[
            ("PINECONE_API_KEY", "pc"),
            ("OPENAI_API_KEY", "sk"),
            ("UPSERT_BATCH_SIZE", "0"),
        ]))
        .unwrap_err();
        assert!(
            matches!(error, ConfigError::InvalidValue { key, .. } if key == "UPSERT_BATCH_SIZE")
        );
    }

    #[test]
    fn provider_and_metric_are_parsed_case_insensitively() {
        let config = Config::from_lookup(lookup_from(&[
            ("PINECONE_API_KEY", "pc"),
            ("EMBEDDING_PROVIDER", "Hashing"),
            ("PINECONE_METRIC", "DotProduct"),
        ]))
        .expect("config");
        assert_eq!(config.embedding_provider, EmbeddingProvider::Hashing);
        assert_eq!(config.distance_metric, DistanceMetric::DotProduct);
    }
}
