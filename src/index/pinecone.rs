//! HTTP client for the Pinecone control and data planes.
//!
//! Index management goes through the controller (`/indexes`). Vector operations go to a
//! per-index data-plane host that is looked up once through `GET /indexes/{name}` and cached.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};

use super::filters::MetadataFilter;
use super::store::VectorStore;
use super::types::{IndexError, IndexSpec, IndexStats, QueryMatch, VectorRecord};
use crate::openai::normalize_base_url;

const API_VERSION: &str = "2024-07";

/// Connection settings for Pinecone.
#[derive(Debug, Clone)]
pub struct PineconeSettings {
    /// Control-plane base URL, e.g. `https://api.pinecone.io`.
    pub controller_url: String,
    /// API key sent in the `Api-Key` header.
    pub api_key: String,
    /// Cloud used for new serverless indexes.
    pub cloud: String,
    /// Region used for new serverless indexes.
    pub region: String,
    /// Upper bound for each request.
    pub timeout: Duration,
}

/// Lightweight HTTP client for Pinecone operations.
pub struct PineconeStore {
    client: Client,
    controller_url: String,
    api_key: String,
    cloud: String,
    region: String,
    timeout: Duration,
    hosts: RwLock<HashMap<String, String>>,
}

#[derive(Deserialize)]
struct ListIndexesResponse {
    #[serde(default)]
    indexes: Vec<IndexDescription>,
}

#[derive(Deserialize)]
struct IndexDescription {
    name: String,
    #[serde(default)]
    host: Option<String>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: Option<usize>,
}

impl PineconeStore {
    /// Construct a client from explicit settings.
    pub fn new(settings: &PineconeSettings) -> Result<Self, IndexError> {
        let controller_url =
            normalize_base_url(&settings.controller_url).map_err(IndexError::InvalidUrl)?;
        let client = Client::builder()
            .user_agent(concat!("docchat/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.timeout)
            .build()
            .map_err(IndexError::Http)?;

        tracing::debug!(
            url = %controller_url,
            cloud = %settings.cloud,
            region = %settings.region,
            "Initialized Pinecone HTTP client"
        );

        Ok(Self {
            client,
            controller_url,
            api_key: settings.api_key.clone(),
            cloud: settings.cloud.clone(),
            region: settings.region.clone(),
            timeout: settings.timeout,
            hosts: RwLock::new(HashMap::new()),
        })
    }

    /// Resolve the data-plane base URL for `index`, caching the answer.
    async fn data_plane(&self, index: &str) -> Result<String, IndexError> {
        let cached = self
            .hosts
            .read()
            .ok()
            .and_then(|hosts| hosts.get(index).cloned());
        if let Some(host) = cached {
            return Ok(host);
        }

        let response = self
            .send(self.request(Method::GET, &self.controller_url, &format!("indexes/{index}")))
            .await?;
        let description: IndexDescription = match response.status() {
            StatusCode::NOT_FOUND => return Err(IndexError::IndexNotFound(index.to_string())),
            status if status.is_success() => self.decode(response).await?,
            status => return Err(unexpected(status, response).await),
        };

        let host = description
            .host
            .filter(|host| !host.trim().is_empty())
            .ok_or_else(|| {
                IndexError::InvalidResponse(format!("index {index} has no data-plane host"))
            })?;
        let base = host_base_url(&host)?;

        if let Ok(mut hosts) = self.hosts.write() {
            hosts.insert(index.to_string(), base.clone());
        }
        tracing::debug!(index, host = %base, "Resolved index host");
        Ok(base)
    }

    fn request(&self, method: Method, base: &str, path: &str) -> reqwest::RequestBuilder {
        let url = format!(
            "{}/{}",
            base.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        self.client
            .request(method, url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, IndexError> {
        request.send().await.map_err(|err| self.map_error(err))
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, IndexError> {
        let bytes = response.bytes().await.map_err(|err| self.map_error(err))?;
        serde_json::from_slice(&bytes).map_err(|err| IndexError::InvalidResponse(err.to_string()))
    }

    /// POST `body` to a data-plane `path` of `index`, returning the successful response.
    async fn data_post(
        &self,
        index: &str,
        path: &str,
        body: &Value,
    ) -> Result<reqwest::Response, IndexError> {
        let base = self.data_plane(index).await?;
        let response = self
            .send(self.request(Method::POST, &base, path).json(body))
            .await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            let error = unexpected(response.status(), response).await;
            tracing::error!(index, path, error = %error, "Pinecone request failed");
            Err(error)
        }
    }

    fn map_error(&self, err: reqwest::Error) -> IndexError {
        if err.is_timeout() {
            IndexError::Timeout(self.timeout)
        } else {
            IndexError::Http(err)
        }
    }
}

/// Data-plane hosts are reported without a scheme; HTTPS is assumed unless one is present.
fn host_base_url(host: &str) -> Result<String, IndexError> {
    let host = host.trim();
    if host.is_empty() {
        return Err(IndexError::InvalidUrl("empty data-plane host".into()));
    }
    let base = if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    };
    normalize_base_url(&base).map_err(IndexError::InvalidUrl)
}

async fn unexpected(status: StatusCode, response: reqwest::Response) -> IndexError {
    let body = response.text().await.unwrap_or_default();
    IndexError::UnexpectedStatus { status, body }
}

#[async_trait]
impl VectorStore for PineconeStore {
    async fn list_indexes(&self) -> Result<Vec<String>, IndexError> {
        let response = self
            .send(self.request(Method::GET, &self.controller_url, "indexes"))
            .await?;
        if !response.status().is_success() {
            let error = unexpected(response.status(), response).await;
            tracing::error!(error = %error, "Failed to list indexes");
            return Err(error);
        }

        let payload: ListIndexesResponse = self.decode(response).await?;
        if let Ok(mut hosts) = self.hosts.write() {
            for description in &payload.indexes {
                if let Some(Ok(base)) = description.host.as_deref().map(host_base_url) {
                    hosts.insert(description.name.clone(), base);
                }
            }
        }
        Ok(payload.indexes.into_iter().map(|index| index.name).collect())
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<(), IndexError> {
        let body = json!({
            "name": spec.name,
            "dimension": spec.dimension,
            "metric": spec.metric.as_str(),
            "spec": {
                "serverless": {
                    "cloud": self.cloud,
                    "region": self.region,
                }
            }
        });

        let response = self
            .send(
                self.request(Method::POST, &self.controller_url, "indexes")
                    .json(&body),
            )
            .await?;

        match response.status() {
            status if status.is_success() => {
                tracing::info!(
                    index = %spec.name,
                    dimension = spec.dimension,
                    metric = %spec.metric,
                    "Created index"
                );
                Ok(())
            }
            StatusCode::CONFLICT => {
                tracing::debug!(index = %spec.name, "Index already exists");
                Ok(())
            }
            status => {
                let error = unexpected(status, response).await;
                tracing::error!(index = %spec.name, error = %error, "Failed to create index");
                Err(error)
            }
        }
    }

    async fn upsert(&self, index: &str, records: Vec<VectorRecord>) -> Result<usize, IndexError> {
        if records.is_empty() {
            return Ok(0);
        }
        let count = records.len();
        let response = self
            .data_post(index, "vectors/upsert", &json!({ "vectors": records }))
            .await?;
        let payload: UpsertResponse = self.decode(response).await?;
        Ok(payload.upserted_count.unwrap_or(count))
    }

    async fn query(
        &self,
        index: &str,
        vector: Vec<f32>,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<QueryMatch>, IndexError> {
        let mut body = json!({
            "vector": vector,
            "topK": top_k,
            "includeMetadata": true,
            "includeValues": false,
        });
        if let Some(filter) = filter.filter(|filter| !filter.is_empty())
            && let Some(object) = body.as_object_mut()
        {
            object.insert("filter".into(), filter.to_query_value());
        }

        let response = self.data_post(index, "query", &body).await?;
        let payload: QueryResponse = self.decode(response).await?;
        Ok(payload.matches)
    }

    async fn delete(&self, index: &str, filter: &MetadataFilter) -> Result<(), IndexError> {
        self.data_post(
            index,
            "vectors/delete",
            &json!({ "filter": filter.to_query_value() }),
        )
        .await?;
        Ok(())
    }

    async fn describe_stats(&self, index: &str) -> Result<IndexStats, IndexError> {
        let response = self
            .data_post(index, "describe_index_stats", &json!({}))
            .await?;
        self.decode(response).await
    }
}
