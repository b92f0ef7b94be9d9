// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Inlet
//!
//! Incremental extraction connectors for paginated REST APIs.
//!
//! Inlet pulls records out of provider APIs (PayPal, Square, Typeform)
//! into a uniform lazy record stream with resumable, per-record
//! checkpointable state.
//!
//! ## Features
//!
//! - **Windowed incremental sync**: date-range slicing under provider
//!   retention and recency constraints
//! - **Heterogeneous pagination**: page/total-pages, opaque cursors,
//!   record-derived tokens, key-set batching
//! - **Resumable state**: monotonic max-based cursors, checkpointable
//!   after any record
//! - **Rate limiting**: token bucket budgets plus fixed throttle cooldown
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use futures::StreamExt;
//! use inlet::connectors::{PaypalConfig, PaypalConnector};
//! use inlet::state::State;
//! use inlet::{Connector, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let connector = PaypalConnector::new(PaypalConfig {
//!         client_id: "...".into(),
//!         client_secret: "...".into(),
//!         start_date: "2024-01-01T00:00:00+00:00".parse().unwrap(),
//!         end_date: None,
//!         is_sandbox: true,
//!     })?;
//!
//!     let status = connector.check().await?;
//!     assert!(status.success);
//!
//!     for stream in connector.streams() {
//!         let mut records = connector.sync(stream, State::new());
//!         while let Some(checkpoint) = records.next().await {
//!             let checkpoint = checkpoint?;
//!             // process checkpoint.record, persist checkpoint.state
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Connector Interface                      │
//! │  check() → CheckResult     streams() → Vec<SourceStream>   │
//! │  sync(stream, state) → Stream<Checkpointed>                 │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌──────────┬──────────┬──────┴──────┬───────────┬────────────┐
//! │   Auth   │   HTTP   │  Paginate   │  Slicing  │   State    │
//! ├──────────┼──────────┼─────────────┼───────────┼────────────┤
//! │ Bearer   │ GET/POST │ Page/Total  │ Windows   │ Cursor max │
//! │ OAuth2   │ Throttle │ Cursor      │ Points    │ Sub-keys   │
//! │          │ Rate Lim │ Token/Batch │ Clock     │ File store │
//! └──────────┴──────────┴─────────────┴───────────┴────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the crate
pub mod error;

/// Common types and type aliases
pub mod types;

/// Injectable wall clock
pub mod clock;

/// Nested JSON field access
pub mod fields;

/// Authentication implementations
pub mod auth;

/// HTTP client with throttle handling and rate limiting
pub mod http;

/// Pagination strategies
pub mod pagination;

/// Date-range slice planning
pub mod slicing;

/// State tracking and persistence
pub mod state;

/// Main sync engine
pub mod engine;

/// Connector trait and check result
pub mod connector;

/// Built-in provider connectors
pub mod connectors;

// ============================================================================
// Re-exports
// ============================================================================

pub use connector::{CheckResult, Connector};
pub use error::{Error, Result};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
