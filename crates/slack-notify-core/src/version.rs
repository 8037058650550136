//! Resource versions.
//!
//! Each `out` reports the Unix time it started at; `in` echoes whatever
//! version it was asked for.

use serde::{Deserialize, Serialize};

/// Version reported when `in` is given no timestamp.
pub const NO_VERSION: &str = "none";

/// Source of the current time.
pub trait Clock {
    /// Seconds since the Unix epoch.
    fn now_unix(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_unix(&self) -> i64 {
        self.0
    }
}

/// The `{"timestamp": "..."}` version object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampVersion {
    #[serde(default)]
    pub timestamp: String,
}

impl TimestampVersion {
    pub fn new(timestamp: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
        }
    }

    /// Version for a notification sent now.
    pub fn now(clock: &dyn Clock) -> Self {
        Self::new(clock.now_unix().to_string())
    }

    /// Version to acknowledge for a requested `in`.
    pub fn echo(requested: Option<&TimestampVersion>) -> Self {
        match requested {
            Some(v) if !v.timestamp.is_empty() => v.clone(),
            _ => Self::new(NO_VERSION),
        }
    }
}
