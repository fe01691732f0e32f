//! Chat-completion clients used to generate answers from retrieved context.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::openai::{ApiError, OpenAiSettings, OpenAiTransport};

/// Generation parameters for chat completions.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionSettings {
    /// Model name.
    pub model: String,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

/// Errors raised by completion providers.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// The remote completion call failed.
    #[error(transparent)]
    Request(#[from] ApiError),
    /// The service answered without any message content.
    #[error("Completion returned no content")]
    EmptyCompletion,
}

impl CompletionError {
    /// Whether repeating the call could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(err) => err.is_retryable(),
            Self::EmptyCompletion => false,
        }
    }
}

/// A single system-plus-user exchange sent to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Fixed instruction framing the answer.
    pub system_prompt: String,
    /// User turn carrying context and question.
    pub user_message: String,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

/// Interface implemented by text-generation backends.
#[async_trait]
pub trait CompletionClient {
    /// Generate the assistant reply for `request`.
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError>;
}

/// Client for the OpenAI `/chat/completions` endpoint and compatible services.
#[derive(Debug, Clone)]
pub struct OpenAiCompletionClient {
    transport: OpenAiTransport,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiCompletionClient {
    /// Build a client for `model` using explicit connection settings.
    pub fn new(settings: &OpenAiSettings, model: impl Into<String>) -> Result<Self, ApiError> {
        Ok(Self {
            transport: OpenAiTransport::new(settings)?,
            model: model.into(),
        })
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompletionClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_message,
                },
            ],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        tracing::debug!(
            model = %self.model,
            max_tokens = request.max_tokens,
            "Requesting completion"
        );
        let response: ChatResponse = self.transport.post_json("chat/completions", &body).await?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(CompletionError::EmptyCompletion)
    }
}
