//! Error handler for the TOTP engine.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TotpError>;

/// Enum representing every failure the engine can report.
///
/// Per-secret errors ([`TotpError::InvalidBase32Character`],
/// [`TotpError::KeyTooLong`]) are reported inline by the scheduler.
/// [`TotpError::ClockUnavailable`] only aborts the current tick.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TotpError {
    #[error("invalid base32 character {character:?} at position {position}")]
    InvalidBase32Character { character: char, position: usize },

    #[error("key length is {length} bytes while at most {max} is expected")]
    KeyTooLong { length: usize, max: usize },

    #[error("clock unavailable: {0}")]
    ClockUnavailable(String),

    #[error("invalid TOTP configuration, {0}")]
    InvalidConfig(&'static str),
}

impl TotpError {
    /// Whether the error is tied to a single secret rather than the whole tick.
    pub fn is_per_secret(&self) -> bool {
        matches!(
            self,
            TotpError::InvalidBase32Character { .. } | TotpError::KeyTooLong { .. }
        )
    }
}
