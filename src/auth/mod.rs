//! Authentication module
//!
//! Supports static bearer tokens (Square, Typeform) and the OAuth2
//! client-credentials flow with basic auth on the token endpoint (PayPal).
//!
//! The `Authenticator` applies credentials to outgoing requests and
//! caches fetched tokens until shortly before they expire.

mod authenticator;
mod types;

pub use authenticator::Authenticator;
pub use types::{AuthConfig, CachedToken};
