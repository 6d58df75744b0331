//! Book catalog search.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::CatalogConfig;
use crate::error::{ClientError, ClientResult};

/// One search hit from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogCandidate {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub description: Option<String>,
    /// ISO 639-1 code as reported by the catalog
    pub language: Option<String>,
    pub categories: Vec<String>,
}

impl CatalogCandidate {
    pub fn has_description(&self) -> bool {
        self.description
            .as_deref()
            .is_some_and(|d| !d.trim().is_empty())
    }
}

/// Title search against an external catalog.
#[async_trait]
pub trait CatalogSearch: Send + Sync {
    /// Search by title, optionally qualified by author. An empty list means no match.
    async fn search(&self, title: &str, author: Option<&str>) -> ClientResult<Vec<CatalogCandidate>>;
}

#[derive(Debug, Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Volume {
    id: String,
    #[serde(default)]
    volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct VolumeInfo {
    title: String,
    subtitle: Option<String>,
    authors: Vec<String>,
    description: Option<String>,
    language: Option<String>,
    categories: Vec<String>,
}

impl From<Volume> for CatalogCandidate {
    fn from(volume: Volume) -> Self {
        let info = volume.volume_info;
        let title = match info.subtitle {
            Some(sub) if !sub.trim().is_empty() && info.title.is_empty() => sub,
            _ => info.title,
        };
        Self {
            id: volume.id,
            title,
            authors: info.authors,
            description: info.description,
            language: info.language,
            categories: info.categories,
        }
    }
}

/// Client for a books-volume search API (`GET {base}/volumes?q=intitle:..`).
pub struct BooksCatalogClient {
    http: Client,
    config: CatalogConfig,
}

impl BooksCatalogClient {
    pub fn new(config: CatalogConfig) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ClientError::Network)?;
        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> ClientResult<Self> {
        Self::new(CatalogConfig::from_env())
    }

    fn query(title: &str, author: Option<&str>) -> String {
        match author.map(str::trim).filter(|a| !a.is_empty()) {
            Some(author) => format!("intitle:{} inauthor:{}", title.trim(), author),
            None => format!("intitle:{}", title.trim()),
        }
    }

    async fn search_once(&self, query: &str) -> ClientResult<Vec<CatalogCandidate>> {
        let url = format!("{}/volumes", self.config.base_url.trim_end_matches('/'));
        let mut request = self.http.get(&url).query(&[
            ("q", query.to_string()),
            ("maxResults", self.config.max_results.to_string()),
            ("printType", "books".to_string()),
        ]);
        if let Some(key) = &self.config.api_key {
            request = request.query(&[("key", key)]);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::http(status, body));
        }

        let volumes: VolumesResponse = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(format!("catalog response: {}", e)))?;

        Ok(volumes
            .items
            .into_iter()
            .map(CatalogCandidate::from)
            .filter(|c| !c.title.trim().is_empty())
            .collect())
    }

    /// Execute with retry logic.
    async fn with_retry<F, Fut, T>(&self, operation: F) -> ClientResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = ClientResult<T>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = Duration::from_millis(250 * 2u64.pow(attempt));
                    warn!(
                        "Catalog request failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| ClientError::InvalidResponse("no attempt made".into())))
    }
}

#[async_trait]
impl CatalogSearch for BooksCatalogClient {
    async fn search(&self, title: &str, author: Option<&str>) -> ClientResult<Vec<CatalogCandidate>> {
        let query = Self::query(title, author);
        debug!(query = %query, "Searching catalog");
        let candidates = self.with_retry(|| self.search_once(&query)).await?;
        debug!(count = candidates.len(), "Catalog search returned");
        Ok(candidates)
    }
}
