//! State types for tracking sync progress
//!
//! These types are serialized to JSON and persisted between runs.
//! Cursor values are canonical ISO 8601 strings, so lexicographic and
//! chronological ordering agree.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Complete state for a connector
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// Per-stream state
    #[serde(default)]
    pub streams: HashMap<String, StreamState>,
}

impl State {
    /// Create a new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get state for a stream
    pub fn get_stream(&self, stream: &str) -> Option<&StreamState> {
        self.streams.get(stream)
    }

    /// Get mutable state for a stream, creating if needed
    pub fn get_stream_mut(&mut self, stream: &str) -> &mut StreamState {
        self.streams.entry(stream.to_string()).or_default()
    }

    /// Get cursor for a stream
    pub fn cursor(&self, stream: &str) -> Option<&str> {
        self.streams.get(stream)?.cursor.as_deref()
    }

    /// Set cursor for a stream
    pub fn set_cursor(&mut self, stream: &str, cursor: String) {
        self.get_stream_mut(stream).cursor = Some(cursor);
    }

    /// Get cursor for a sub-key within a stream (e.g. one form of many)
    pub fn sub_cursor(&self, stream: &str, sub_key: &str) -> Option<&str> {
        self.streams
            .get(stream)?
            .sub_cursors
            .get(sub_key)
            .map(String::as_str)
    }

    /// Set cursor for a sub-key within a stream
    pub fn set_sub_cursor(&mut self, stream: &str, sub_key: &str, cursor: String) {
        self.get_stream_mut(stream)
            .sub_cursors
            .insert(sub_key.to_string(), cursor);
    }
}

/// State for a single stream
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamState {
    /// Current cursor value (for incremental sync)
    #[serde(default)]
    pub cursor: Option<String>,

    /// Per-entity cursors for streams that track multiple sub-entities
    /// (e.g. Typeform responses keep one cursor per form)
    #[serde(default)]
    pub sub_cursors: HashMap<String, String>,
}

impl StreamState {
    /// Create a new empty stream state
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_default() {
        let state = State::new();
        assert!(state.streams.is_empty());
    }

    #[test]
    fn test_state_cursor() {
        let mut state = State::new();
        assert!(state.cursor("transactions").is_none());

        state.set_cursor("transactions", "2024-01-01T00:00:00+00:00".to_string());
        assert_eq!(
            state.cursor("transactions"),
            Some("2024-01-01T00:00:00+00:00")
        );
    }

    #[test]
    fn test_sub_cursors_are_isolated() {
        let mut state = State::new();
        state.set_sub_cursor("responses", "form_a", "2024-01-01T00:00:00+00:00".into());
        state.set_sub_cursor("responses", "form_b", "2024-06-01T00:00:00+00:00".into());

        assert_eq!(
            state.sub_cursor("responses", "form_a"),
            Some("2024-01-01T00:00:00+00:00")
        );
        assert_eq!(
            state.sub_cursor("responses", "form_b"),
            Some("2024-06-01T00:00:00+00:00")
        );
        assert_eq!(state.sub_cursor("responses", "form_c"), None);
    }

    #[test]
    fn test_state_serialization() {
        let mut state = State::new();
        state.set_cursor("transactions", "2024-01-01T00:00:00+00:00".to_string());
        state.set_sub_cursor("responses", "form_a", "2024-02-01T00:00:00+00:00".into());

        let json = serde_json::to_string(&state).unwrap();
        let restored: State = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, state);
    }
}
