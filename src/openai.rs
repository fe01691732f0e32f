//! HTTP transport shared by the OpenAI-compatible embedding and completion clients.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Connection settings for an OpenAI-compatible API.
#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    /// Base URL including the version prefix, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    /// Bearer token sent with every request.
    pub api_key: String,
    /// Upper bound for each request.
    pub timeout: Duration,
}

/// Errors raised while talking to an OpenAI-compatible API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Base URL failed to parse.
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before a response was received.
    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),
    /// The request exceeded the configured timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    /// The service answered with a non-success status.
    #[error("Unexpected API response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the service.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// The response body did not have the expected shape.
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// Whether repeating the request could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(err) => err.is_connect() || err.is_request(),
            Self::Timeout(_) => true,
            Self::UnexpectedStatus { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            Self::InvalidUrl(_) | Self::InvalidResponse(_) => false,
        }
    }
}

/// Authenticated JSON client for one OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiTransport {
    client: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl OpenAiTransport {
    /// Build a transport from explicit settings.
    pub fn new(settings: &OpenAiSettings) -> Result<Self, ApiError> {
        let base_url = normalize_base_url(&settings.base_url).map_err(ApiError::InvalidUrl)?;
        let client = Client::builder()
            .user_agent(concat!("docchat/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.timeout)
            .build()
            .map_err(ApiError::Http)?;

        tracing::debug!(url = %base_url, "Initialized OpenAI-compatible HTTP client");
        Ok(Self {
            client,
            base_url,
            api_key: settings.api_key.clone(),
            timeout: settings.timeout,
        })
    }

    /// POST `body` to `path` and decode the JSON response.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|err| self.map_error(err))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::UnexpectedStatus { status, body });
        }

        let bytes = response.bytes().await.map_err(|err| self.map_error(err))?;
        serde_json::from_slice(&bytes).map_err(|err| ApiError::InvalidResponse(err.to_string()))
    }

    fn map_error(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout(self.timeout)
        } else {
            ApiError::Http(err)
        }
    }
}

pub(crate) fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string().trim_end_matches('/').to_string())
}
