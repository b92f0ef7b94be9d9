//! Injectable wall clock
//!
//! Slice planning and date validation depend on "now". Routing those reads
//! through a trait keeps planners deterministic under test.

use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Source of the current time
pub trait Clock: Send + Sync {
    /// Current instant in UTC
    fn now(&self) -> DateTime<Utc>;
}

/// System wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fixed clock for deterministic tests
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Shared clock handle
pub type SharedClock = Arc<dyn Clock>;

/// Create the default system clock handle
pub fn system_clock() -> SharedClock {
    Arc::new(SystemClock)
}
