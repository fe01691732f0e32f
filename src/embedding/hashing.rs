//! Offline embeddings built by hashing words into a fixed number of buckets.

use super::{EmbeddingClient, EmbeddingClientError};
use async_trait::async_trait;
use sha2::{Digest, Sha256};

/// Deterministic embedding client for keyless runs and tests.
///
/// Each lowercase word is hashed with SHA-256 into one of `dimension` buckets and the bucket
/// counts are scaled to unit length. Texts sharing vocabulary therefore score higher under
/// cosine similarity, and identical texts always produce identical vectors.
#[derive(Debug, Clone, Copy)]
pub struct HashingEmbeddingClient {
    dimension: usize,
}

impl HashingEmbeddingClient {
    /// Construct a client producing vectors of `dimension` floats.
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    /// Length of produced vectors.
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    fn bucket(word: &str, dimension: usize) -> usize {
        let digest = Sha256::digest(word.as_bytes());
        let mut prefix = [0_u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        (u64::from_le_bytes(prefix) % dimension as u64) as usize
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut counts = vec![0.0_f32; self.dimension];
        for word in text.split_whitespace() {
            counts[Self::bucket(&word.to_lowercase(), self.dimension)] += 1.0;
        }

        let length = counts.iter().map(|count| count * count).sum::<f32>().sqrt();
        if length > 0.0 {
            counts.iter_mut().for_each(|count| *count /= length);
        }
        counts
    }
}

#[async_trait]
impl EmbeddingClient for HashingEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if self.dimension == 0 {
            return Err(EmbeddingClientError::GenerationFailed(
                "hashing dimension is zero".to_string(),
            ));
        }
        if texts.is_empty() {
            return Err(EmbeddingClientError::GenerationFailed(
                "nothing to embed".to_string(),
            ));
        }

        tracing::debug!(dimension = self.dimension, texts = texts.len(), "Hashing texts");
        Ok(texts.iter().map(|text| self.embed(text)).collect())
    }
}
