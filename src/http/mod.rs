//! HTTP client module
//!
//! Provides the HTTP collaborator used by every stream.
//!
//! # Features
//!
//! - **Throttle cooldown**: one fixed, conservatively long sleep on HTTP
//!   429, then a single retry
//! - **Rate Limiting**: token bucket budget using governor
//! - **Provider errors**: non-2xx responses decoded into structured error
//!   detail lists
//! - **Authentication**: integration with the auth module

mod client;
mod rate_limit;

pub use client::{ApiRequest, HttpClient, HttpClientConfig, Page};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
