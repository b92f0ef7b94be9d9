//! Authenticator implementation
//!
//! Applies credentials to outgoing requests and refreshes OAuth2 access
//! tokens when they expire.

use super::types::{AuthConfig, CachedToken};
use crate::error::{Error, Result};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Applies authentication to HTTP requests
pub struct Authenticator {
    config: AuthConfig,
    /// Cached access token for the client-credentials flow
    cached_token: Arc<RwLock<Option<CachedToken>>>,
    /// Client used for token endpoint requests
    http_client: Client,
}

/// Token endpoint response body
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

impl Authenticator {
    /// Create a new authenticator
    pub fn new(config: AuthConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    /// Create an authenticator sharing an existing HTTP client
    pub fn with_client(config: AuthConfig, http_client: Client) -> Self {
        Self {
            config,
            cached_token: Arc::new(RwLock::new(None)),
            http_client,
        }
    }

    /// Apply authentication to a request builder
    pub async fn apply(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        match &self.config {
            AuthConfig::None => Ok(request),
            AuthConfig::Bearer { token } => Ok(request.bearer_auth(token)),
            AuthConfig::Oauth2ClientCredentials { .. } => {
                let token = self.get_or_refresh_token().await?;
                Ok(request.bearer_auth(token))
            }
        }
    }

    /// Verify the credentials can produce a token.
    ///
    /// A no-op for static configurations; for the client-credentials
    /// flow this hits the token endpoint, which is what connectivity
    /// checks want.
    pub async fn ensure_token(&self) -> Result<()> {
        if matches!(self.config, AuthConfig::Oauth2ClientCredentials { .. }) {
            self.get_or_refresh_token().await?;
        }
        Ok(())
    }

    /// Return a valid access token, refreshing it if needed.
    ///
    /// Double-checked so concurrent requests refresh the token at most
    /// once.
    async fn get_or_refresh_token(&self) -> Result<String> {
        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref() {
                if !token.is_expired() {
                    return Ok(token.token.clone());
                }
            }
        }

        let mut cached = self.cached_token.write().await;
        if let Some(token) = cached.as_ref() {
            if !token.is_expired() {
                return Ok(token.token.clone());
            }
        }

        let token = self.fetch_token().await?;
        let access_token = token.token.clone();
        *cached = Some(token);
        Ok(access_token)
    }

    /// Fetch a fresh token from the token endpoint
    async fn fetch_token(&self) -> Result<CachedToken> {
        let AuthConfig::Oauth2ClientCredentials {
            token_url,
            client_id,
            client_secret,
        } = &self.config
        else {
            return Err(Error::TokenRefresh {
                message: "auth configuration has no token endpoint".to_string(),
            });
        };

        debug!("Fetching OAuth2 access token from {token_url}");

        let response = self
            .http_client
            .post(token_url)
            .basic_auth(client_id, Some(client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| Error::TokenRefresh {
                message: format!("token request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::TokenRefresh {
                message: format!("token endpoint returned HTTP {}: {body}", status.as_u16()),
            });
        }

        let token: TokenResponse =
            response.json().await.map_err(|e| Error::TokenRefresh {
                message: format!("invalid token response: {e}"),
            })?;

        Ok(match token.expires_in {
            Some(seconds) => CachedToken::expires_in(token.access_token, seconds),
            None => CachedToken::new(token.access_token, None),
        })
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.config {
            AuthConfig::None => "none",
            AuthConfig::Bearer { .. } => "bearer",
            AuthConfig::Oauth2ClientCredentials { .. } => "oauth2_client_credentials",
        };
        f.debug_struct("Authenticator")
            .field("auth", &kind)
            .finish_non_exhaustive()
    }
}
