//! HTTP client with throttle handling and rate limiting
//!
//! Wraps reqwest with the behavior every provider stream needs:
//! - a token bucket budget so we never exceed the documented request rate
//! - a fixed cooldown on HTTP 429 followed by one retry; repeated
//!   throttling is surfaced to the caller instead of retried forever
//! - transient 5xx and transport failures retried with backoff
//! - provider error payloads preserved as structured detail lists

use super::rate_limit::{RateLimiter, RateLimiterConfig};
use crate::auth::{AuthConfig, Authenticator};
use crate::error::{Error, Result};
use crate::types::Method;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL for all requests
    pub base_url: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Maximum number of retries for transient failures
    pub max_retries: u32,
    /// Initial delay for exponential backoff
    pub initial_backoff: Duration,
    /// Maximum delay for exponential backoff
    pub max_backoff: Duration,
    /// Fixed cooldown slept once after an HTTP 429.
    ///
    /// Set longer than the provider's penalty window (PayPal bans the
    /// calling IP for five minutes).
    pub throttle_cooldown: Duration,
    /// Rate limiter configuration
    pub rate_limit: Option<RateLimiterConfig>,
    /// Default headers for all requests
    pub default_headers: HashMap<String, String>,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(60),
            throttle_cooldown: Duration::from_secs(301),
            rate_limit: None,
            default_headers: HashMap::new(),
            user_agent: format!("inlet/{}", env!("CARGO_PKG_VERSION")),
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
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set max retries for transient failures
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set the fixed throttle cooldown
    pub fn throttle_cooldown(mut self, cooldown: Duration) -> Self {
        self.config.throttle_cooldown = cooldown;
        self
    }

    /// Set rate limiter
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.rate_limit = Some(config);
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

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// A single API request
#[derive(Debug, Clone, Default)]
pub struct ApiRequest {
    /// HTTP method
    pub method: Method,
    /// Path relative to the base URL (or an absolute URL)
    pub path: String,
    /// Query parameters
    pub query: HashMap<String, String>,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// Request body (JSON)
    pub body: Option<Value>,
}

impl ApiRequest {
    /// Create a GET request
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            ..Default::default()
        }
    }

    /// Create a POST request
    pub fn post(path: impl Into<String>) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            ..Default::default()
        }
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set JSON body
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// One fetched page of a response
#[derive(Debug, Clone)]
pub struct Page {
    /// HTTP status code
    pub status: u16,
    /// Final request URL as echoed by the transport
    pub url: Url,
    /// Parsed JSON body (Null for empty bodies)
    pub body: Value,
}

/// HTTP client with throttle handling and rate limiting
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    authenticator: Option<Authenticator>,
    rate_limiter: Option<RateLimiter>,
}

impl HttpClient {
    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .expect("Failed to build HTTP client");

        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);

        Self {
            client,
            config,
            authenticator: None,
            rate_limiter,
        }
    }

    /// Create a client with authentication
    pub fn with_auth(config: HttpClientConfig, auth_config: AuthConfig) -> Self {
        let mut client = Self::with_config(config);
        client.authenticator = Some(Authenticator::with_client(
            auth_config,
            client.client.clone(),
        ));
        client
    }

    /// Get the authenticator, if one is configured
    pub fn authenticator(&self) -> Option<&Authenticator> {
        self.authenticator.as_ref()
    }

    /// Execute a request and return the parsed page.
    ///
    /// Sleeps the configured cooldown once on HTTP 429 and retries; a
    /// second throttle is returned as [`Error::Throttled`]. Transient 5xx
    /// and transport failures are retried with exponential backoff up to
    /// `max_retries`.
    pub async fn execute(&self, request: ApiRequest) -> Result<Page> {
        let full_url = self.build_url(&request.path);
        let mut throttled_once = false;
        let mut attempt = 0;

        loop {
            if let Some(ref limiter) = self.rate_limiter {
                limiter.wait().await;
            }

            let mut req = self
                .client
                .request(request.method.into(), &full_url);

            for (key, value) in &self.config.default_headers {
                req = req.header(key.as_str(), value.as_str());
            }
            for (key, value) in &request.headers {
                req = req.header(key.as_str(), value.as_str());
            }
            if !request.query.is_empty() {
                req = req.query(&request.query);
            }
            if let Some(ref body) = request.body {
                req = req.json(body);
            }
            if let Some(ref auth) = self.authenticator {
                req = auth.apply(req).await?;
            }

            let response = match req.send().await {
                Ok(response) => response,
                Err(e) => {
                    if (e.is_timeout() || e.is_connect()) && attempt < self.config.max_retries {
                        let delay = self.calculate_backoff(attempt);
                        warn!(
                            "Transport error ({e}), attempt {}/{}, retrying in {delay:?}",
                            attempt + 1,
                            self.config.max_retries + 1
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(Error::Http(e));
                }
            };

            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                let cooldown = self.config.throttle_cooldown;
                if throttled_once {
                    return Err(Error::Throttled {
                        cooldown_secs: cooldown.as_secs(),
                    });
                }
                warn!(
                    "Throttled (429) on {}, cooling down for {cooldown:?}",
                    full_url
                );
                tokio::time::sleep(cooldown).await;
                throttled_once = true;
                continue;
            }

            if status.is_server_error() && attempt < self.config.max_retries {
                let delay = self.calculate_backoff(attempt);
                warn!(
                    "Request failed with {}, attempt {}/{}, retrying in {delay:?}",
                    status.as_u16(),
                    attempt + 1,
                    self.config.max_retries + 1
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                let body = response.text().await.unwrap_or_default();
                return Err(Error::auth(format!(
                    "provider rejected credentials (HTTP {}): {body}",
                    status.as_u16()
                )));
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(Error::provider(status.as_u16(), error_details(&body)));
            }

            let url = response.url().clone();
            let text = response.text().await.map_err(Error::Http)?;
            let body = if text.trim().is_empty() {
                Value::Null
            } else {
                serde_json::from_str(&text)?
            };

            debug!("Request succeeded: {} {}", status.as_u16(), url);
            return Ok(Page {
                status: status.as_u16(),
                url,
                body,
            });
        }
    }

    /// Build full URL from path
    fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }

        match &self.config.base_url {
            Some(base) => {
                let base = base.trim_end_matches('/');
                let path = path.trim_start_matches('/');
                format!("{base}/{path}")
            }
            None => path.to_string(),
        }
    }

    /// Calculate backoff delay for a given attempt
    fn calculate_backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        std::cmp::min(
            self.config.initial_backoff * factor,
            self.config.max_backoff,
        )
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("has_authenticator", &self.authenticator.is_some())
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

/// Decode a provider error payload into a structured detail list.
///
/// Square reports `{"errors": [...]}`, PayPal `{"details": [...]}`;
/// anything else is preserved whole so nothing is lost.
fn error_details(body: &str) -> Value {
    let Ok(parsed) = serde_json::from_str::<Value>(body) else {
        return json!([body]);
    };
    if let Some(map) = parsed.as_object() {
        for key in ["errors", "details"] {
            if let Some(details) = map.get(key) {
                if details.is_array() {
                    return details.clone();
                }
            }
        }
    }
    parsed
}
