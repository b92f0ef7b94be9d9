//! State tracking module
//!
//! Handles cursor tracking and persistence between sync runs.
//!
//! # Overview
//!
//! The state module provides:
//! - `State` - per-stream cursors, with sub-key cursors for multi-entity
//!   streams
//! - `updated_cursor` - the monotonic max-based cursor fold
//! - `StateManager` - file-based state persistence with atomic writes

mod cursor;
mod manager;
mod types;

pub use cursor::updated_cursor;
pub use manager::StateManager;
pub use types::{State, StreamState};
