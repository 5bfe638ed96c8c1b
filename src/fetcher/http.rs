//! HTTP transport for the assessment API
//!
//! Thin wrapper over [`reqwest::Client`] that adds the bearer token, resolves
//! paths against the configured base URL and hands the raw status, headers
//! and body back to the paginator. Retries and rate limiting happen one layer
//! up in [`crate::fetcher::pagination`].

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::fetcher::api_config::ApiConfig;
use crate::fetcher::{FetcherError, FetcherResult, PageResponse, PageTransport};
use crate::metrics::HttpRequestMetrics;

/// HTTP client bound to one API base URL and token
pub struct ApiHttpClient {
    client: Client,
    base_url: String,
    token: String,
}

impl ApiHttpClient {
    /// Build a client from the run configuration
    ///
    /// # Errors
    /// Returns [`FetcherError::InvalidConfig`] when the configuration is
    /// invalid or the TLS backend cannot be initialised.
    pub fn new(config: &ApiConfig) -> FetcherResult<Self> {
        config.validate()?;

        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| FetcherError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        Ok(Self::with_client(client, config))
    }

    /// Wrap an existing [`reqwest::Client`]
    pub fn with_client(client: Client, config: &ApiConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            token: config.token.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl PageTransport for ApiHttpClient {
    async fn get(&self, path: &str, query: &[(&str, String)]) -> FetcherResult<PageResponse> {
        let url = self.url(path);
        let metrics = HttpRequestMetrics::start(path);
        debug!(
            correlation_id = metrics.correlation_id(),
            url = %url,
            params = query.len(),
            "GET"
        );

        let response = match self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                metrics.record_network_error();
                return Err(FetcherError::NetworkError(format!("GET {url}: {e}")));
            }
        };

        let status = response.status();
        metrics.record_complete(status.as_u16());

        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|e| FetcherError::NetworkError(format!("reading body of {url}: {e}")))?;

        Ok(PageResponse {
            status,
            headers,
            body,
        })
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}
