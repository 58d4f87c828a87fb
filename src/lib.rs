//! Badger TOTP is a self-contained one-time password engine.
//!
//! SHA-1, HMAC-SHA1 and Base32 are implemented from scratch, codes follow
//! RFC 6238, and [`scheduler::Scheduler`] refreshes a list of named secrets
//! once per time step for a small display.
//!
//! ```rust
//! use badger_totp::scheduler::{Scheduler, Secret, Trigger};
//! use badger_totp::totp::TotpConfig;
//!
//! let mut scheduler = Scheduler::new(
//!     vec![Secret::new("rfc", "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ")],
//!     TotpConfig::default(),
//! );
//! let state = scheduler.refresh(59, Trigger::Manual);
//! assert_eq!(state.entries()[0].code().as_code(), Some("287082"));
//! assert_eq!(state.seconds_remaining(), 1);
//! ```

#![forbid(unsafe_code)]
#![deny(missing_debug_implementations, unused_mut)]

pub mod clock;
pub mod config;
pub mod crypto;
pub mod error;
pub mod scheduler;
pub mod telemetry;
pub mod totp;

pub use error::{Result, TotpError};
