//! Port traits for infrastructure boundaries.
//!
//! The wait stores are concrete types. The only seam is the clock, so tests
//! can pin registration timestamps.

use chrono::{DateTime, Utc};

#[cfg_attr(test, mockall::automock)]
pub trait ClockPort: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
