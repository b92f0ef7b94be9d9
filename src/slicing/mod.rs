//! Date-range slice planning
//!
//! Incremental streams fetch their history in ordered date slices. Two
//! planners cover the provider shapes we deal with:
//!
//! - `WindowPlanner` - contiguous `[start, end)` windows aligned to the
//!   UTC day grid, honoring a recency margin for providers whose fresh
//!   data is not yet complete
//! - `PointInTimePlanner` - discrete snapshot instants stepped by a fixed
//!   interval, always ending on the effective end
//!
//! `validate_dates` rejects configurations outside the provider's
//! supported date range before any request is made.

mod planner;
mod types;

pub use planner::{validate_dates, DateConstraints, PointInTimePlanner, WindowPlanner};
pub use types::Slice;
