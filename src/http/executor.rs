//! Request executor
//!
//! Issues a single HTTP call with the session's auth header, recovers from
//! rate limiting, and decodes the JSON body. An empty or non-JSON body is a
//! distinguishable terminal signal (`Ok(None)`), not a hard failure; bodies
//! carrying an `error` key flow through to callers unchanged.

use crate::error::{Error, Result};
use crate::pagination::PageFetcher;
use crate::query::Query;
use crate::routes::Domain;
use crate::types::ApiError;
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, warn};
use url::Url;

/// Configuration for the request executor
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// How long to wait before retrying a throttled (429) request
    pub throttle_delay: Duration,
    /// User agent string
    pub user_agent: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            // The API unblocks throttled subscriptions after a few seconds
            throttle_delay: Duration::from_secs(3),
            user_agent: format!("plenty-rest/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Executes requests against one PlentyMarkets system
pub struct RequestExecutor {
    client: Client,
    base_url: String,
    token: String,
    config: ExecutorConfig,
}

impl RequestExecutor {
    /// Create an executor with default configuration
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self> {
        Self::with_config(base_url, token, ExecutorConfig::default())
    }

    /// Create an executor with custom configuration
    pub fn with_config(
        base_url: &str,
        token: impl Into<String>,
        config: ExecutorConfig,
    ) -> Result<Self> {
        let parsed = Url::parse(base_url)?;
        match parsed.scheme() {
            "https" => {}
            "http" => warn!("base url {base_url} is not https, credentials travel unprotected"),
            scheme => {
                return Err(Error::config(format!(
                    "unsupported url scheme '{scheme}' for base url {base_url}"
                )))
            }
        }

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            config,
        })
    }

    /// The session base url
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue one request and decode the body.
    ///
    /// Returns `Ok(None)` when the server produced no decodable JSON body.
    /// A 429 status sleeps out the throttle window and retries the same
    /// request indefinitely; requests are never dropped due to throttling.
    pub async fn execute(
        &self,
        method: Method,
        domain: Domain,
        path: &str,
        query: Option<&Query>,
        body: Option<&Value>,
    ) -> Result<Option<Value>> {
        let endpoint = format!("{}{}{}", self.base_url, domain.route(), path);
        debug!("Endpoint: {endpoint}");
        let pairs = query.map(Query::to_pairs).unwrap_or_default();
        if !pairs.is_empty() {
            debug!("Params: {pairs:?}");
        }

        let response = loop {
            let mut request = self
                .client
                .request(method.clone(), &endpoint)
                .header(AUTHORIZATION, &self.token);
            if !pairs.is_empty() {
                request = request.query(&pairs);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await.map_err(Error::Http)?;
            if response.status().as_u16() != 429 {
                break response;
            }
            warn!("API: request throttled, limit for subscription reached");
            tokio::time::sleep(self.config.throttle_delay).await;
        };

        match response.json::<Value>().await {
            Ok(decoded) => {
                if let Some(api_error) = ApiError::from_payload(&decoded) {
                    // Error payloads are logged here but flow through to the
                    // caller unchanged.
                    error!("Request failed: {api_error}");
                }
                Ok(Some(decoded))
            }
            Err(_) => {
                error!("No response for request {method} at {endpoint}");
                Ok(None)
            }
        }
    }

    /// GET convenience wrapper
    pub async fn get(
        &self,
        domain: Domain,
        path: &str,
        query: Option<&Query>,
    ) -> Result<Option<Value>> {
        self.execute(Method::GET, domain, path, query, None).await
    }

    /// POST convenience wrapper
    pub async fn post(
        &self,
        domain: Domain,
        path: &str,
        query: Option<&Query>,
        body: Option<&Value>,
    ) -> Result<Option<Value>> {
        self.execute(Method::POST, domain, path, query, body).await
    }

    /// PUT convenience wrapper
    pub async fn put(
        &self,
        domain: Domain,
        path: &str,
        query: Option<&Query>,
        body: Option<&Value>,
    ) -> Result<Option<Value>> {
        self.execute(Method::PUT, domain, path, query, body).await
    }
}

#[async_trait]
impl PageFetcher for RequestExecutor {
    async fn fetch_page(
        &self,
        domain: Domain,
        path: &str,
        query: &Query,
    ) -> Result<Option<Value>> {
        self.get(domain, path, Some(query)).await
    }
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("base_url", &self.base_url)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
