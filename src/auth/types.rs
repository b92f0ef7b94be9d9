//! Authentication configuration types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Authentication configuration for a connector
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    /// No authentication
    #[default]
    None,

    /// Static bearer token (Square, Typeform)
    Bearer {
        /// The bearer token
        token: String,
    },

    /// OAuth2 client-credentials flow (PayPal).
    ///
    /// The client id and secret are sent as basic auth on the token
    /// endpoint; the fetched access token is cached until shortly
    /// before it expires.
    Oauth2ClientCredentials {
        /// Token endpoint URL
        token_url: String,
        /// OAuth2 client id
        client_id: String,
        /// OAuth2 client secret
        client_secret: String,
    },
}

impl AuthConfig {
    /// Static bearer token auth
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
        }
    }

    /// OAuth2 client-credentials auth
    pub fn oauth2_client_credentials(
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self::Oauth2ClientCredentials {
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

/// A fetched access token with its expiration
#[derive(Debug, Clone)]
pub struct CachedToken {
    /// The access token
    pub token: String,
    /// When the token expires, if the provider reported a lifetime
    pub expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    /// Create a new cached token
    pub fn new(token: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// Create a token that expires `seconds` from now
    pub fn expires_in(token: impl Into<String>, seconds: i64) -> Self {
        Self {
            token: token.into(),
            expires_at: Some(Utc::now() + Duration::seconds(seconds)),
        }
    }

    /// Whether the token is expired or about to expire.
    ///
    /// A 60 second skew keeps a token that would expire mid-request from
    /// being used.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() + Duration::seconds(60) >= expires_at,
            None => false,
        }
    }
}
