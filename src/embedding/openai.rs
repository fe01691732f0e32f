use super::{EmbeddingClient, EmbeddingClientError};
use crate::openai::{ApiError, OpenAiSettings, OpenAiTransport};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Embedding client for the OpenAI `/embeddings` endpoint and compatible services.
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddingClient {
    transport: OpenAiTransport,
    model: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

impl OpenAiEmbeddingClient {
    /// Build a client for `model` using explicit connection settings.
    pub fn new(settings: &OpenAiSettings, model: impl Into<String>) -> Result<Self, ApiError> {
        Ok(Self {
            transport: OpenAiTransport::new(settings)?,
            model: model.into(),
        })
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if texts.is_empty() {
            return Err(EmbeddingClientError::GenerationFailed(
                "no texts provided".to_string(),
            ));
        }

        tracing::debug!(model = %self.model, texts = texts.len(), "Requesting embeddings");
        let request = EmbeddingRequest {
            model: &self.model,
            input: &texts,
        };
        let response: EmbeddingResponse = self.transport.post_json("embeddings", &request).await?;

        if response.data.len() != texts.len() {
            return Err(ApiError::InvalidResponse(format!(
                "expected {} embeddings, received {}",
                texts.len(),
                response.data.len()
            ))
            .into());
        }

        let mut data = response.data;
        if data.iter().all(|item| item.index.is_some()) {
            data.sort_by_key(|item| item.index);
        }
        Ok(data.into_iter().map(|item| item.embedding).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};
    use serde_json::json;
    use std::time::Duration;

    fn client(server: &MockServer) -> OpenAiEmbeddingClient {
        OpenAiEmbeddingClient::new(
            &OpenAiSettings {
                base_url: server.base_url(),
                api_key: "sk-test".into(),
                timeout: Duration::from_secs(5),
            },
            "text-embedding-ada-002",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn embeddings_are_returned_in_input_order() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/embeddings").json_body(json!({
                    "model": "text-embedding-ada-002",
                    "input": ["first", "second"]
                }));
                then.status(200).json_body(json!({
                    "object": "list",
                    "data": [
                        { "object": "embedding", "index": 1, "embedding": [0.0, 1.0] },
                        { "object": "embedding", "index": 0, "embedding": [1.0, 0.0] }
                    ]
                }));
            })
            .await;

        let vectors = client(&server)
            .generate_embeddings(vec!["first".into(), "second".into()])
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn short_responses_are_invalid() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/embeddings");
                then.status(200).json_body(json!({ "data": [] }));
            })
            .await;

        let err = client(&server)
            .generate_embeddings(vec!["only".into()])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EmbeddingClientError::Request(ApiError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn server_errors_are_retryable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/embeddings");
                then.status(503).body("overloaded");
            })
            .await;

        let err = client(&server)
            .generate_embeddings(vec!["text".into()])
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
