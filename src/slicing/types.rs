//! Slice types
//!
//! A slice is one unit of fetch work: either a bounded date window or a
//! single point-in-time snapshot. Slices for a stream are emitted in
//! ascending order and adjacent windows share their boundary instant.

use crate::fields::format_datetime;
use chrono::{DateTime, Utc};

/// One planned unit of fetch work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slice {
    /// Inclusive start of the slice
    pub start: DateTime<Utc>,
    /// End of the slice; None for point-in-time and unbounded slices
    pub end: Option<DateTime<Utc>>,
}

impl Slice {
    /// Create a bounded window slice
    pub fn window(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    /// Create a point-in-time (or unbounded) slice
    pub fn point(start: DateTime<Utc>) -> Self {
        Self { start, end: None }
    }

    /// Canonical string form of the slice start
    pub fn start_param(&self) -> String {
        format_datetime(self.start)
    }

    /// Canonical string form of the slice end, if bounded
    pub fn end_param(&self) -> Option<String> {
        self.end.map(format_datetime)
    }
}
