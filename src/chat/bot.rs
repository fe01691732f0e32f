//! Retrieval-augmented chatbot: search, assemble context, then generate.

use std::sync::Arc;

use super::context::{NO_RESULTS_RESPONSE, SYSTEM_PROMPT, build_context, build_user_message};
use super::types::{ChatResult, SourceCitation};
use crate::config::{Config, ConfigError};
use crate::generation::{
    CompletionClient, CompletionRequest, CompletionSettings, OpenAiCompletionClient,
};
use crate::index::{EmbeddingIndexClient, SearchError, SearchResult};
use crate::processing::{ProcessingError, connect_index};

/// Retrieval-augmented question answering over one index.
///
/// Each call to [`RagChatbot::chat`] is independent: search, assemble context, generate. Nothing
/// is remembered between turns.
pub struct RagChatbot {
    index: EmbeddingIndexClient,
    completion: Arc<dyn CompletionClient + Send + Sync>,
    settings: CompletionSettings,
    max_context_chunks: usize,
}

impl RagChatbot {
    /// Wire an index client and a completion backend together.
    pub fn new(
        index: EmbeddingIndexClient,
        completion: Arc<dyn CompletionClient + Send + Sync>,
        settings: CompletionSettings,
        max_context_chunks: usize,
    ) -> Self {
        Self {
            index,
            completion,
            settings,
            max_context_chunks: max_context_chunks.max(1),
        }
    }

    /// Build a chatbot from configuration, connecting to the configured services.
    pub async fn from_config(config: &Config, index_name: &str) -> Result<Self, ProcessingError> {
        let completion =
            OpenAiCompletionClient::new(&config.openai_settings()?, config.completion_model.clone())
                .map_err(|err| ConfigError::InvalidValue {
                    key: "OPENAI_BASE_URL".into(),
                    reason: err.to_string(),
                })?;
        let index = connect_index(config, index_name).await?;
        tracing::info!(index = index_name, model = %config.completion_model, "Chatbot ready");
        Ok(Self::new(
            index,
            Arc::new(completion),
            config.completion_settings(),
            config.max_context_chunks,
        ))
    }

    /// Retrieve the chunks most relevant to `query`.
    ///
    /// Uses the configured context size when `top_k` is `None`.
    pub async fn search_relevant_docs(
        &self,
        query: &str,
        top_k: Option<usize>,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let top_k = top_k.unwrap_or(self.max_context_chunks);
        self.index.search(query, top_k, None).await.inspect_err(|err| {
            tracing::error!(
                error = %err,
                retryable = err.is_retryable(),
                "Failed to search documents"
            );
        })
    }

    /// Format retrieved chunks as a prompt context block.
    pub fn build_context(&self, results: &[SearchResult]) -> String {
        build_context(results)
    }

    /// Ask the completion backend to answer `query` from `context`.
    ///
    /// Failures become an apologetic answer so the turn always has something to show.
    pub async fn generate_response(&self, query: &str, context: &str) -> String {
        let request = CompletionRequest {
            system_prompt: SYSTEM_PROMPT.to_string(),
            user_message: build_user_message(context, query),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };

        match self.completion.complete(request).await {
            Ok(answer) => answer,
            Err(err) => {
                tracing::error!(
                    error = %err,
                    retryable = err.is_retryable(),
                    "Failed to generate response"
                );
                format!("Sorry, I encountered an error generating a response: {err}")
            }
        }
    }

    /// Answer one question from the indexed documents.
    ///
    /// A failed search answers with an apology naming the error; the model is not called.
    pub async fn chat(&self, query: &str) -> ChatResult {
        let results = match self.search_relevant_docs(query, None).await {
            Ok(results) => results,
            Err(err) => {
                let response =
                    format!("Sorry, I encountered an error searching the documents: {err}");
                return ChatResult::unanswered(query, response);
            }
        };

        if results.is_empty() {
            tracing::info!("No relevant documents found for query");
            return ChatResult::unanswered(query, NO_RESULTS_RESPONSE.to_string());
        }

        let context = self.build_context(&results);
        let response = self.generate_response(query, &context).await;
        tracing::info!(sources = results.len(), "Answered query");

        ChatResult {
            query: query.to_string(),
            response,
            sources: results.iter().map(SourceCitation::from).collect(),
            context_used: context,
        }
    }
}
