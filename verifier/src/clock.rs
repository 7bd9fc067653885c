// Copyright (c) 2023 The MobileCoin Foundation

//! Time source used for certificate expiry evaluation.

use core::fmt::Debug;
use core::time::Duration;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the current time.
pub trait Clock: Debug + Send + Sync {
    /// The current time as the duration since the UNIX epoch
    fn now(&self) -> Duration;
}

/// The system wall clock
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        // A system clock before 1970 is treated as the epoch itself
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
    }
}

/// A clock that is stuck at one point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(Duration);

impl FixedClock {
    /// Create a clock always reporting `unix_time`
    pub fn new(unix_time: Duration) -> Self {
        Self(unix_time)
    }
}

impl From<der::DateTime> for FixedClock {
    fn from(date_time: der::DateTime) -> Self {
        Self(date_time.unix_duration())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Duration {
        self.0
    }
}
