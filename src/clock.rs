//! Clock port and adapters.
//!
//! A clock that cannot produce a timestamp is reported as
//! [`TotpError::ClockUnavailable`] instead of crashing.

use std::cell::Cell;

use crate::error::{Result, TotpError};

/// Port for getting the current time.
pub trait Clock {
    /// Get the current Unix timestamp in seconds.
    fn now(&self) -> Result<u64>;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Result<u64> {
        (**self).now()
    }
}

/// System clock using the OS time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Result<u64> {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .map_err(|err| TotpError::ClockUnavailable(err.to_string()))
    }
}

/// Manually driven clock, mostly for tests and replays.
///
/// `None` simulates an unreadable clock.
#[derive(Debug, Default)]
pub struct FixedClock {
    timestamp: Cell<Option<u64>>,
}

impl FixedClock {
    pub fn new(timestamp: u64) -> Self {
        Self {
            timestamp: Cell::new(Some(timestamp)),
        }
    }

    /// A clock which never answers.
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn set(&self, timestamp: Option<u64>) {
        self.timestamp.set(timestamp);
    }

    /// Move the clock forward by `seconds`.
    pub fn advance(&self, seconds: u64) {
        if let Some(now) = self.timestamp.get() {
            self.timestamp.set(Some(now.saturating_add(seconds)));
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Result<u64> {
        self.timestamp
            .get()
            .ok_or_else(|| TotpError::ClockUnavailable("no timestamp set".into()))
    }
}
