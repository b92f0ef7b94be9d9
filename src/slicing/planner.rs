//! Slice planners and date validation

use super::types::Slice;
use crate::error::{Error, Result};
use crate::fields::format_datetime;
use chrono::{DateTime, Duration, NaiveTime, Utc};

// ============================================================================
// Date Validation
// ============================================================================

/// Provider constraints on the requestable date range
#[derive(Debug, Clone, Copy)]
pub struct DateConstraints {
    /// How far back the provider retains data
    pub retention: Duration,
    /// How fresh data may be requested (records younger than this are
    /// incomplete on the provider side)
    pub min_lag: Duration,
}

/// Validate a configured date range against provider constraints.
///
/// Runs before any network call. Error messages name the offending value
/// and the allowed bound.
pub fn validate_dates(
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
    constraints: &DateConstraints,
    now: DateTime<Utc>,
) -> Result<()> {
    if let Some(end) = end {
        if start > end {
            return Err(Error::config(format!(
                "start_date {} is later than end_date {}",
                format_datetime(start),
                format_datetime(end)
            )));
        }
    }

    let oldest = now - constraints.retention;
    if start < oldest {
        return Err(Error::config(format!(
            "start_date {} is older than the oldest supported date {}",
            format_datetime(start),
            format_datetime(oldest)
        )));
    }

    let freshest = now - constraints.min_lag;
    if start > freshest {
        return Err(Error::config(format!(
            "start_date {} is too recent, the latest supported date is {}",
            format_datetime(start),
            format_datetime(freshest)
        )));
    }

    Ok(())
}

// ============================================================================
// Window Planner
// ============================================================================

/// Plans contiguous date windows aligned to the UTC day grid
///
/// Windows cover `[resolved_start, effective_end)` without gaps; adjacent
/// windows share their boundary instant. The first window runs from the
/// resolved start to the next grid boundary, and the final window absorbs
/// any partial tail so it ends exactly on the effective end.
#[derive(Debug, Clone, Copy)]
pub struct WindowPlanner {
    /// Window length (also the grid step)
    pub window: Duration,
    /// Recency margin; no window may start later than `now - min_lag`
    pub min_lag: Duration,
}

impl WindowPlanner {
    /// Create a new window planner
    pub fn new(window: Duration, min_lag: Duration) -> Self {
        Self { window, min_lag }
    }

    /// Plan the windows for one run.
    ///
    /// `prior_cursor` resumes from previously synced state; planning with
    /// the same inputs always yields the same windows. Returns no windows
    /// when the stream is caught up or entirely inside the recency margin.
    pub fn plan(
        &self,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
        prior_cursor: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Vec<Slice> {
        let end = end.unwrap_or(now);
        let resolved = prior_cursor.map_or(start, |cursor| cursor.max(start));
        let bound = (now - self.min_lag).min(end);

        if resolved + self.window > bound {
            return Vec::new();
        }

        let mut slices = Vec::new();
        let mut begin = resolved;
        loop {
            let next = floor_to_grid(begin, self.window) + self.window;
            if next + self.window > end {
                // absorb the partial tail into the final window
                slices.push(Slice::window(begin, end));
                break;
            }
            if next > bound {
                slices.push(Slice::window(begin, next.min(end)));
                break;
            }
            slices.push(Slice::window(begin, next));
            begin = next;
        }
        slices
    }
}

/// Round down to the window grid, anchored at the UTC midnight of `t`'s day
fn floor_to_grid(t: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    let midnight = t.date_naive().and_time(NaiveTime::MIN).and_utc();
    let window_secs = window.num_seconds().max(1);
    let steps = (t - midnight).num_seconds() / window_secs;
    midnight + Duration::seconds(steps * window_secs)
}

// ============================================================================
// Point-in-Time Planner
// ============================================================================

/// Plans discrete snapshot instants stepped by a fixed interval
///
/// Steps from the resolved start and always appends the effective end as
/// the final snapshot, so a run observes the current value even when no
/// full interval has elapsed. A prior cursor at or past the effective end
/// yields no slices.
#[derive(Debug, Clone, Copy)]
pub struct PointInTimePlanner {
    /// Interval between snapshots
    pub window: Duration,
}

impl PointInTimePlanner {
    /// Create a new point-in-time planner
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    /// Plan the snapshot instants for one run
    pub fn plan(
        &self,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
        prior_cursor: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Vec<Slice> {
        let end = end.unwrap_or(now);

        if let Some(cursor) = prior_cursor {
            if cursor >= end {
                return Vec::new();
            }
        }

        let mut begin = match prior_cursor {
            Some(cursor) => (cursor + self.window).max(start),
            None => start,
        };

        let mut slices = Vec::new();
        while begin < end {
            slices.push(Slice::point(begin));
            begin += self.window;
        }
        slices.push(Slice::point(end));
        slices
    }
}
