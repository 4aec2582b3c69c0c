//! Single-attempt HTTP GET with status validation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use tracing::{debug, instrument};
use url::Url;

use crate::error::FetchError;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_USER_AGENT: &str = concat!("page-loader/", env!("CARGO_PKG_VERSION"));

/// Successful (2xx) response.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Something that can GET a URL. The page loader only talks to this seam.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Performs one GET. Non-2xx statuses are errors; nothing is retried.
    async fn get(&self, url: &Url) -> Result<FetchResponse, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// reqwest-backed [`Fetch`] implementation. Follows redirects.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(config: &ClientConfig) -> reqwest::Result<Self> {
        let client = ClientBuilder::new()
            .use_rustls_tls()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()?;

        Ok(Self { client })
    }
}

/// Rejects anything reqwest should never be asked to fetch.
pub fn validate_scheme(url: &Url) -> Result<(), FetchError> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(FetchError::invalid_url(
            url.as_str(),
            format!("unsupported scheme `{other}`"),
        )),
    }
}

#[async_trait]
impl Fetch for HttpClient {
    #[instrument(level = "debug", skip(self), fields(url = %url))]
    async fn get(&self, url: &Url) -> Result<FetchResponse, FetchError> {
        validate_scheme(url)?;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| {
                if e.is_builder() {
                    FetchError::invalid_url(url.as_str(), e.to_string())
                } else {
                    FetchError::connection(url.as_str(), e)
                }
            })?;

        let status = response.status();
        debug!(status = status.as_u16(), "response received");
        if !status.is_success() {
            return Err(FetchError::http_status(url.as_str(), status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::connection(url.as_str(), e))?;

        Ok(FetchResponse {
            status: status.as_u16(),
            content_type,
            body: body.to_vec(),
        })
    }
}
