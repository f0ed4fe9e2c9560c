//! HTTP client for the contracts filter endpoint
//!
//! Provides a client that handles:
//! - Browser-like headers the challenge gate expects
//! - Session cookies on every request
//! - Response classification (access denied vs other failures)
//! - Backoff calculation for the engine's retry policy

use crate::error::{Error, Result};
use crate::pagination::{FilterRequest, PageResponse, ProbeRequest};
use crate::session::SessionTokens;
use crate::types::BackoffType;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, COOKIE, ORIGIN, PRAGMA, REFERER};
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Filter endpoint of the contracts API
pub const DEFAULT_ENDPOINT: &str = "https://e-play.pl/wp-json/contracts/v1/filter";

/// Origin of the page that normally calls the endpoint
pub const DEFAULT_ORIGIN: &str = "https://e-play.pl";

/// Page that normally calls the endpoint
pub const DEFAULT_REFERER: &str = "https://e-play.pl/umowy/";

/// Desktop Chrome user agent; the gate rejects obvious bot agents
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/144.0.0.0 Safari/537.36";

const DEFAULT_ACCEPT_LANGUAGE: &str = "ka-GE,ka;q=0.9,en-GB;q=0.8,en-US;q=0.7,en;q=0.6";

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Filter endpoint URL
    pub endpoint: String,
    /// `origin` header
    pub origin: String,
    /// `referer` header
    pub referer: String,
    /// User agent string
    pub user_agent: String,
    /// `accept-language` header
    pub accept_language: String,
    /// Timeout for page requests
    pub timeout: Duration,
    /// Timeout for token probes
    pub probe_timeout: Duration,
    /// Initial delay for backoff
    pub initial_backoff: Duration,
    /// Maximum delay for backoff
    pub max_backoff: Duration,
    /// Type of backoff strategy
    pub backoff_type: BackoffType,
    /// Extra headers for all requests
    pub default_headers: HashMap<String, String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            origin: DEFAULT_ORIGIN.to_string(),
            referer: DEFAULT_REFERER.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            timeout: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(10),
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(30),
            backoff_type: BackoffType::Constant,
            default_headers: HashMap::new(),
        }
    }
}

impl HttpClientConfig {
    /// Create a new config builder
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

/// Builder for HTTP client config
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the filter endpoint
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    /// Set the `origin` and `referer` pair
    pub fn site(mut self, origin: impl Into<String>, referer: impl Into<String>) -> Self {
        self.config.origin = origin.into();
        self.config.referer = referer.into();
        self
    }

    /// Set the page request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the probe timeout
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.config.probe_timeout = timeout;
        self
    }

    /// Set backoff configuration
    pub fn backoff(mut self, backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        self.config.backoff_type = backoff_type;
        self.config.initial_backoff = initial;
        self.config.max_backoff = max;
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Set `accept-language`
    pub fn accept_language(mut self, value: impl Into<String>) -> Self {
        self.config.accept_language = value.into();
        self
    }

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// HTTP client for the filter endpoint
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
}

impl HttpClient {
    /// Create a new HTTP client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(HttpClientConfig::default())
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { client, config })
    }

    /// Get the client configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Fetch one page of contracts.
    ///
    /// 401/403 map to [`Error::AccessDenied`]; any other non-2xx status maps to
    /// [`Error::HttpStatus`]; a body that is not the expected JSON maps to
    /// [`Error::Decode`].
    pub async fn fetch_page(
        &self,
        request: &FilterRequest,
        tokens: &SessionTokens,
    ) -> Result<PageResponse> {
        let response = self.send(request, tokens, self.config.timeout).await?;
        let status = response.status();

        if is_access_denied(status) {
            let body = response.text().await.unwrap_or_default();
            let preview: String = body.chars().take(200).collect();
            warn!(page = request.paged, status = status.as_u16(), body = %preview, "Access denied");
            return Err(Error::AccessDenied {
                status: status.as_u16(),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::decode(format!("Failed to read response body: {e}")))?;

        debug!(page = request.paged, bytes = body.len(), "Page request succeeded");
        PageResponse::from_body(&body)
    }

    /// Check whether tokens pass the gate with a one-item request
    pub async fn probe(&self, tokens: &SessionTokens) -> Result<bool> {
        let response = self
            .send(&ProbeRequest::default(), tokens, self.config.probe_timeout)
            .await?;
        let status = response.status();
        debug!(status = status.as_u16(), "Token probe finished");
        Ok(status == StatusCode::OK)
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        body: &B,
        tokens: &SessionTokens,
        timeout: Duration,
    ) -> Result<Response> {
        let mut req = self
            .client
            .post(&self.config.endpoint)
            .header(ACCEPT, "*/*")
            .header(ACCEPT_LANGUAGE, &self.config.accept_language)
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .header(ORIGIN, &self.config.origin)
            .header(REFERER, &self.config.referer);

        for (key, value) in &self.config.default_headers {
            req = req.header(key.as_str(), value.as_str());
        }

        if !tokens.is_empty() {
            req = req.header(COOKIE, tokens.cookie_header());
        }

        req.timeout(timeout).json(body).send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                }
            } else {
                Error::Http(e)
            }
        })
    }

    /// Calculate backoff delay for a given retry attempt (0-based)
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let delay = match self.config.backoff_type {
            BackoffType::Constant => self.config.initial_backoff,
            BackoffType::Linear => self.config.initial_backoff * (attempt + 1),
            BackoffType::Exponential => {
                let factor = 2u32.saturating_pow(attempt);
                self.config.initial_backoff * factor
            }
        };

        std::cmp::min(delay, self.config.max_backoff)
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// The challenge gate answers stale sessions with 403 (occasionally 401)
fn is_access_denied(status: StatusCode) -> bool {
    matches!(status, StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED)
}
