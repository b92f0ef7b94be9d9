//! Connector trait
//!
//! A connector bundles the streams of one provider behind a shared HTTP
//! client, authenticator, and rate budget. Callers pick a stream, hand
//! in prior state, and consume the checkpointable record stream.

use crate::engine::{RecordStream, SourceStream};
use crate::error::Result;
use crate::state::State;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// Check Result
// ============================================================================

/// Result of a connection check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    /// Whether the check succeeded
    pub success: bool,

    /// Error message if failed
    pub message: Option<String>,
}

impl CheckResult {
    /// Create a successful check result
    pub fn success() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    /// Create a failed check result
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

// ============================================================================
// Connector Trait
// ============================================================================

/// Core trait that all provider connectors implement
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connector name (e.g. "paypal")
    fn name(&self) -> &'static str;

    /// Test credentials and configuration against the live provider.
    ///
    /// Auth failures come back as a failed [`CheckResult`] rather than an
    /// error; errors are reserved for not being able to run the check.
    async fn check(&self) -> Result<CheckResult>;

    /// The streams this connector exposes
    fn streams(&self) -> Vec<Arc<dyn SourceStream>>;

    /// Stream by name
    fn stream(&self, name: &str) -> Option<Arc<dyn SourceStream>> {
        self.streams().into_iter().find(|s| s.name() == name)
    }

    /// Sync one stream from prior state, yielding records lazily with
    /// per-record checkpoint state
    fn sync(&self, stream: Arc<dyn SourceStream>, state: State) -> RecordStream;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_result_success() {
        let result = CheckResult::success();
        assert!(result.success);
        assert!(result.message.is_none());
    }

    #[test]
    fn test_check_result_failure() {
        let result = CheckResult::failure("Connection failed");
        assert!(!result.success);
        assert_eq!(result.message, Some("Connection failed".to_string()));
    }
}
