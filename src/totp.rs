//! Time-based one-time password derivation (RFC 6238, HMAC-SHA1).

use serde::{Deserialize, Serialize};

use crate::crypto::{base32_decode, hmac_sha1};
use crate::error::{Result, TotpError};

/// Represents a TOTP configuration.
/// Pure value object shared by every secret of a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTotpConfig")]
pub struct TotpConfig {
    /// Time step in seconds (usually 30).
    #[serde(rename = "period")]
    step: u32,
    /// Number of digits in the code (usually 6).
    digits: u32,
}

#[derive(Deserialize)]
struct RawTotpConfig {
    #[serde(default = "default_step")]
    period: u32,
    #[serde(default = "default_digits")]
    digits: u32,
}

fn default_step() -> u32 {
    TotpConfig::DEFAULT_STEP
}

fn default_digits() -> u32 {
    TotpConfig::DEFAULT_DIGITS
}

impl TryFrom<RawTotpConfig> for TotpConfig {
    type Error = TotpError;

    fn try_from(raw: RawTotpConfig) -> Result<Self> {
        Self::new(raw.period, raw.digits)
    }
}

impl TotpConfig {
    pub const DEFAULT_DIGITS: u32 = 6;
    pub const DEFAULT_STEP: u32 = 30;
    /// `10^9` is the largest power of ten fitting in a `u32`.
    pub const MAX_DIGITS: u32 = 9;

    /// Create a new TOTP configuration with validation.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `step` is zero or if `digits` is not contained
    /// between 1 and [`TotpConfig::MAX_DIGITS`].
    pub fn new(step: u32, digits: u32) -> Result<Self> {
        if step == 0 {
            return Err(TotpError::InvalidConfig("time step must be greater than 0"));
        }

        if !(1..=Self::MAX_DIGITS).contains(&digits) {
            return Err(TotpError::InvalidConfig("digits must be between 1 and 9"));
        }

        Ok(Self { step, digits })
    }

    pub fn step(&self) -> u32 {
        self.step
    }

    pub fn digits(&self) -> u32 {
        self.digits
    }
}

impl Default for TotpConfig {
    fn default() -> Self {
        Self {
            step: Self::DEFAULT_STEP,
            digits: Self::DEFAULT_DIGITS,
        }
    }
}

/// One derived code and the time it stays valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpCode {
    code: String,
    seconds_remaining: u32,
}

impl OtpCode {
    /// Zero-padded decimal code.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Seconds before the next step boundary, in `1..=step`.
    pub fn seconds_remaining(&self) -> u32 {
        self.seconds_remaining
    }

    pub fn into_inner(self) -> String {
        self.code
    }
}

/// Index of the step containing `unix_time`.
#[inline]
pub fn counter(unix_time: u64, step: u32) -> u64 {
    unix_time / u64::from(step)
}

/// Seconds until the next step boundary.
///
/// On an exact boundary a full window is left, never zero.
#[inline]
pub fn seconds_remaining(unix_time: u64, step: u32) -> u32 {
    // `unix_time % step` is strictly lower than `step`, so it fits in a u32.
    step - (unix_time % u64::from(step)) as u32
}

/// Generate the code of a Base32 secret at `unix_time`.
///
/// # Errors
///
/// Returns [`TotpError::InvalidBase32Character`] when the secret is not
/// Base32 and [`TotpError::KeyTooLong`] when it decodes to more than 64
/// bytes.
pub fn totp(unix_time: u64, key_base32: &str, config: &TotpConfig) -> Result<OtpCode> {
    let key = base32_decode(key_base32)?;
    totp_raw(unix_time, &key, config)
}

/// Generate the code of an already decoded key at `unix_time`.
pub fn totp_raw(unix_time: u64, key: &[u8], config: &TotpConfig) -> Result<OtpCode> {
    let time_counter = counter(unix_time, config.step);
    let mac = hmac_sha1(key, &time_counter.to_be_bytes())?;

    let code_int = truncate(&mac) % 10u32.pow(config.digits);
    let code = format!("{:0>width$}", code_int, width = config.digits as usize);

    Ok(OtpCode {
        code,
        seconds_remaining: seconds_remaining(unix_time, config.step),
    })
}

/// Dynamic truncation (RFC 4226).
fn truncate(mac: &[u8; 20]) -> u32 {
    let offset = usize::from(mac[19] & 0x0f);

    u32::from_be_bytes([
        mac[offset],
        mac[offset + 1],
        mac[offset + 2],
        mac[offset + 3],
    ]) & 0x7fff_ffff
}
