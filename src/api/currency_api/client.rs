use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde_json::Value;
use tracing::{debug, warn};

use super::endpoints;
use super::models::{ApiError, CurrencyInfo};

/// Anything that can GET a URL and hand back parsed JSON.
///
/// The rate pipeline only depends on this, so it can be driven by an
/// in-memory fetcher in tests.
#[async_trait]
pub trait JsonFetcher: Send + Sync {
    async fn fetch_json(&self, url: &str) -> Result<Value, ApiError>;
}

/// Client for the public currency-rate CDN.
///
/// Holds one pooled `reqwest::Client` for every request; cloning the client
/// shares the pool.
#[derive(Clone)]
pub struct CurrencyApiClient {
    http_client: HttpClient,
    base_url: String,
}

impl CurrencyApiClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://cdn.jsdelivr.net";

    /// Create a client against `base_url` (the public CDN, a mirror, or a test server)
    pub fn with_base_url(http_client: HttpClient, base_url: String) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Build the shared connection pool used by every request
    pub fn build_http_client(timeout: Duration) -> Result<HttpClient, ApiError> {
        HttpClient::builder()
            .timeout(timeout)
            .user_agent(concat!("rate-indicator/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Transport(format!("Failed to build HTTP client: {}", e)))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `url` and parse the body as JSON.
    ///
    /// # Returns
    /// * `Ok(Value)` - parsed body of a 2xx response
    /// * `Err(ApiError)` - transport failure, non-success status, empty body or bad JSON
    pub async fn fetch_json(&self, url: &str) -> Result<Value, ApiError> {
        debug!("GET {}", url);

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| ApiError::Transport(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            warn!("GET {} returned {}", url, status);
            return Err(ApiError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Transport(format!("{}: {}", url, e)))?;

        if bytes.is_empty() {
            return Err(ApiError::EmptyBody(url.to_string()));
        }

        serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::MalformedJson(format!("{}: {}", url, e)))
    }

    /// GET currencies.json
    ///
    /// Returns every published currency code with its display name, sorted by code.
    pub async fn list_currencies(&self) -> Result<Vec<CurrencyInfo>, ApiError> {
        let url = endpoints::currencies_url(&self.base_url);
        let payload = self.fetch_json(&url).await?;

        let entries = payload.as_object().ok_or_else(|| {
            ApiError::UnexpectedShape(format!("{} is not a JSON object", url))
        })?;

        let mut currencies: Vec<CurrencyInfo> = entries
            .iter()
            .map(|(code, name)| CurrencyInfo {
                code: code.clone(),
                name: name.as_str().unwrap_or_default().to_string(),
            })
            .collect();
        currencies.sort_by(|a, b| a.code.cmp(&b.code));

        Ok(currencies)
    }
}

#[async_trait]
impl JsonFetcher for CurrencyApiClient {
    async fn fetch_json(&self, url: &str) -> Result<Value, ApiError> {
        CurrencyApiClient::fetch_json(self, url).await
    }
}
