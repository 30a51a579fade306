// crates/network/src/client.rs
//! HTTP client wrapper with retry

use crate::error::{NetworkError, NetworkResult};
use narrate_resilience::{with_retry_if, RetryPolicy};
use reqwest::{Client as ReqwestClient, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Retry policy for idempotent requests; `None` disables retries
    pub retry_policy: Option<RetryPolicy>,
    /// Sent as `Authorization: Bearer <token>` when set
    pub bearer_token: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("Narrate/{}", env!("CARGO_PKG_VERSION")),
            retry_policy: Some(RetryPolicy::new(3).with_initial_delay(Duration::from_millis(100))),
            bearer_token: None,
        }
    }
}

/// JSON-over-HTTP client
#[derive(Clone)]
pub struct Client {
    inner: ReqwestClient,
    config: ClientConfig,
}

impl Client {
    /// Creates a new client with default configuration
    pub fn new() -> NetworkResult<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Creates a new client with custom configuration
    pub fn with_config(config: ClientConfig) -> NetworkResult<Self> {
        let inner = ReqwestClient::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(NetworkError::Http)?;

        Ok(Self { inner, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// GETs `url` and decodes the JSON body. Retried per the retry policy;
    /// 4xx answers fail immediately.
    pub async fn get_json<T: DeserializeOwned>(&self, url: Url) -> NetworkResult<T> {
        let url = &url;
        let response = self
            .send_with_retry(move || self.inner.get(url.clone()))
            .await?;
        Ok(response.json::<T>().await?)
    }

    /// POSTs `body` as JSON. Sent exactly once.
    pub async fn post_json<B: Serialize + ?Sized>(&self, url: Url, body: &B) -> NetworkResult<()> {
        let response = self.authorize(self.inner.post(url).json(body)).send().await?;
        check_status(response)?;
        Ok(())
    }

    async fn send_with_retry<F>(&self, build: F) -> NetworkResult<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let policy = self
            .config
            .retry_policy
            .clone()
            .unwrap_or_else(RetryPolicy::none);
        let build = &build;

        with_retry_if(&policy, NetworkError::is_retryable, move || async move {
            let response = self.authorize(build()).send().await?;
            check_status(response)
        })
        .await
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

fn check_status(response: Response) -> NetworkResult<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(NetworkError::Status {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        })
    }
}
