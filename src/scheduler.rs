//! Multi-key refresh scheduler.
//!
//! Holds an immutable list of named secrets and rebuilds every code from a
//! single timestamp snapshot on each tick. The host loop owns sleeping and
//! input handling; the scheduler is purely synchronous.

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

use crate::clock::Clock;
use crate::error::{Result, TotpError};
use crate::totp::{self, TotpConfig};

/// Named shared secret, as loaded from the key store.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Secret {
    name: String,
    /// Base32-encoded secret (RFC 4648).
    key: String,
}

impl Secret {
    /// Create a new [`Secret`].
    ///
    /// The key is not validated here: decoding failures are reported per
    /// entry on refresh.
    pub fn new(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secret")
            .field("name", &self.name)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// What caused a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// First refresh, no previous state.
    Startup,
    /// The clock crossed a step boundary since the last refresh.
    Boundary,
    /// Explicit request from the host (e.g. a button press).
    Manual,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::Startup => "startup",
            Trigger::Boundary => "boundary",
            Trigger::Manual => "manual",
        }
    }
}

/// Scheduler life cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Waiting for the next boundary or manual refresh.
    #[default]
    Idle,
    /// Codes are being rebuilt.
    Recomputing,
    /// The last tick produced a fresh [`RefreshState`].
    Ready,
}

/// Code of one entry, or the sentinel error replacing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryCode {
    Code(String),
    Error(TotpError),
}

impl EntryCode {
    pub fn is_error(&self) -> bool {
        matches!(self, EntryCode::Error(_))
    }

    /// Returns the code, if any.
    pub fn as_code(&self) -> Option<&str> {
        match self {
            EntryCode::Code(code) => Some(code),
            EntryCode::Error(_) => None,
        }
    }
}

impl std::fmt::Display for EntryCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryCode::Code(code) => f.write_str(code),
            EntryCode::Error(_) => f.write_str("ERROR"),
        }
    }
}

/// A labelled code ready to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    name: String,
    code: EntryCode,
}

impl Entry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn code(&self) -> &EntryCode {
        &self.code
    }
}

/// Snapshot of every code, rebuilt wholesale on each refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshState {
    entries: Vec<Entry>,
    seconds_remaining: u32,
    counter: u64,
    generated_at: u64,
    trigger: Trigger,
}

impl RefreshState {
    /// Entries, in the order secrets were loaded.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Minimum validity left across all entries, in `1..=step`.
    pub fn seconds_remaining(&self) -> u32 {
        self.seconds_remaining
    }

    /// Time step index every code was computed against.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Unix timestamp sampled for this refresh.
    pub fn generated_at(&self) -> u64 {
        self.generated_at
    }

    pub fn trigger(&self) -> Trigger {
        self.trigger
    }

    /// Number of entries reporting an error.
    pub fn error_count(&self) -> usize {
        self.entries.iter().filter(|e| e.code.is_error()).count()
    }

    /// Refresh timestamp shifted to the display timezone.
    pub fn local_time(&self, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
        let seconds = i64::try_from(self.generated_at).ok()?;
        DateTime::from_timestamp(seconds, 0).map(|utc| utc.with_timezone(&offset))
    }
}

/// Owns the secrets and the last [`RefreshState`].
#[derive(Debug)]
pub struct Scheduler {
    secrets: Vec<Secret>,
    config: TotpConfig,
    state: Option<RefreshState>,
    phase: Phase,
}

impl Scheduler {
    /// Create a new [`Scheduler`] with no state.
    pub fn new(secrets: Vec<Secret>, config: TotpConfig) -> Self {
        Self {
            secrets,
            config,
            state: None,
            phase: Phase::Idle,
        }
    }

    pub fn secrets(&self) -> &[Secret] {
        &self.secrets
    }

    pub fn config(&self) -> &TotpConfig {
        &self.config
    }

    /// Last successfully built state.
    pub fn state(&self) -> Option<&RefreshState> {
        self.state.as_ref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Countdown to display between refreshes.
    pub fn seconds_remaining(&self, now: u64) -> u32 {
        totp::seconds_remaining(now, self.config.step())
    }

    /// Sample `clock` once and refresh if no state exists yet or a step
    /// boundary was crossed since the last refresh.
    ///
    /// # Errors
    ///
    /// Returns [`TotpError::ClockUnavailable`] when the clock cannot be
    /// read; the previous state is kept.
    pub fn tick(&mut self, clock: &impl Clock) -> Result<Option<&RefreshState>> {
        let now = self.sample(clock)?;
        let counter = totp::counter(now, self.config.step());

        let trigger = match &self.state {
            None => Trigger::Startup,
            Some(state) if state.counter != counter => Trigger::Boundary,
            Some(_) => {
                self.phase = Phase::Idle;
                return Ok(None);
            },
        };

        Ok(Some(self.refresh(now, trigger)))
    }

    /// Recompute immediately, whatever the remaining time.
    ///
    /// # Errors
    ///
    /// Returns [`TotpError::ClockUnavailable`] when the clock cannot be
    /// read; the previous state is kept.
    pub fn manual_refresh(&mut self, clock: &impl Clock) -> Result<&RefreshState> {
        let now = self.sample(clock)?;
        Ok(self.refresh(now, Trigger::Manual))
    }

    /// Rebuild every entry from the `now` snapshot.
    pub fn refresh(&mut self, now: u64, trigger: Trigger) -> &RefreshState {
        self.phase = Phase::Recomputing;

        let mut min_remaining: Option<u32> = None;
        let entries: Vec<Entry> = self
            .secrets
            .iter()
            .map(|secret| {
                let code = match totp::totp(now, secret.key(), &self.config) {
                    Ok(otp) => {
                        let remaining = otp.seconds_remaining();
                        min_remaining =
                            Some(min_remaining.map_or(remaining, |m| m.min(remaining)));
                        EntryCode::Code(otp.into_inner())
                    },
                    Err(err) => {
                        tracing::warn!(secret = %secret.name(), error = %err, "cannot derive code");
                        EntryCode::Error(err)
                    },
                };

                Entry {
                    name: secret.name().to_owned(),
                    code,
                }
            })
            .collect();

        let state = RefreshState {
            seconds_remaining: min_remaining
                .unwrap_or_else(|| self.seconds_remaining(now)),
            counter: totp::counter(now, self.config.step()),
            generated_at: now,
            trigger,
            entries,
        };

        let errors = state.error_count();
        metrics::counter!("totp_refresh_total", "trigger" => trigger.as_str()).increment(1);
        metrics::counter!("totp_secret_errors_total").increment(errors as u64);
        metrics::gauge!("totp_seconds_remaining").set(f64::from(state.seconds_remaining));
        tracing::debug!(
            trigger = trigger.as_str(),
            counter = state.counter,
            secrets = state.entries.len(),
            errors,
            seconds_remaining = state.seconds_remaining,
            "codes refreshed"
        );

        self.phase = Phase::Ready;
        self.state.insert(state)
    }

    fn sample(&mut self, clock: &impl Clock) -> Result<u64> {
        clock.now().inspect_err(|err| {
            self.phase = Phase::Idle;
            tracing::error!(error = %err, "tick skipped, keeping previous codes");
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::clock::FixedClock;

    const RFC_KEY_BASE32: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    /// Clock moving forward by one second on every read.
    struct SteppingClock {
        now: Cell<u64>,
        reads: Cell<usize>,
    }

    impl Clock for SteppingClock {
        fn now(&self) -> Result<u64> {
            let now = self.now.get();
            self.now.set(now + 1);
            self.reads.set(self.reads.get() + 1);
            Ok(now)
        }
    }

    fn secrets() -> Vec<Secret> {
        vec![
            Secret::new("rfc", RFC_KEY_BASE32),
            Secret::new("github", "JBSWY3DPEHPK3PXP"),
            Secret::new("badge", "LMESUJEY7PTJSNYO5LKSME5HWQO6XZ5L"),
        ]
    }

    #[test]
    fn test_refresh() {
        let mut scheduler = Scheduler::new(secrets(), TotpConfig::default());
        let state = scheduler.refresh(59, Trigger::Manual);

        assert_eq!(state.entries().len(), 3);
        assert_eq!(state.entries()[0].name(), "rfc");
        assert_eq!(
            state.entries()[0].code(),
            &EntryCode::Code("287082".into())
        );
        assert_eq!(state.seconds_remaining(), 1);
        assert_eq!(state.counter(), 1);
        assert_eq!(state.error_count(), 0);
        assert_eq!(scheduler.phase(), Phase::Ready);
    }

    #[test]
    fn test_single_snapshot_per_tick() {
        // 59 is the last second of the window, a resampled clock would
        // move the next secrets into the following one.
        let clock = SteppingClock {
            now: Cell::new(59),
            reads: Cell::new(0),
        };
        let mut scheduler = Scheduler::new(
            vec![
                Secret::new("a", RFC_KEY_BASE32),
                Secret::new("b", RFC_KEY_BASE32),
                Secret::new("c", RFC_KEY_BASE32),
            ],
            TotpConfig::default(),
        );

        let state = scheduler.tick(&clock).unwrap().unwrap();
        assert_eq!(clock.reads.get(), 1);
        assert_eq!(state.generated_at(), 59);
        for entry in state.entries() {
            assert_eq!(entry.code().as_code(), Some("287082"));
        }
    }

    #[test]
    fn test_tick_on_boundary() {
        let clock = FixedClock::new(60);
        let mut scheduler = Scheduler::new(secrets(), TotpConfig::default());

        let state = scheduler.tick(&clock).unwrap().unwrap();
        assert_eq!(state.trigger(), Trigger::Startup);
        assert_eq!(state.seconds_remaining(), 30);

        clock.advance(29);
        assert!(scheduler.tick(&clock).unwrap().is_none());
        assert_eq!(scheduler.phase(), Phase::Idle);
        assert_eq!(scheduler.seconds_remaining(89), 1);

        clock.advance(1);
        let state = scheduler.tick(&clock).unwrap().unwrap();
        assert_eq!(state.trigger(), Trigger::Boundary);
        assert_eq!(state.counter(), 3);
        assert_eq!(state.seconds_remaining(), 30);

        // Several windows skipped at once (host asleep).
        clock.advance(95);
        let state = scheduler.tick(&clock).unwrap().unwrap();
        assert_eq!(state.counter(), 6);
        assert_eq!(state.seconds_remaining(), 25);
    }

    #[test]
    fn test_manual_refresh() {
        let clock = FixedClock::new(60);
        let mut scheduler = Scheduler::new(secrets(), TotpConfig::default());
        scheduler.tick(&clock).unwrap();

        clock.advance(10);
        let state = scheduler.manual_refresh(&clock).unwrap();
        assert_eq!(state.trigger(), Trigger::Manual);
        assert_eq!(state.generated_at(), 70);
        assert_eq!(state.seconds_remaining(), 20);

        // Same window as the manual refresh.
        clock.advance(5);
        assert!(scheduler.tick(&clock).unwrap().is_none());
    }

    #[test]
    fn test_clock_unavailable_keeps_state() {
        let clock = FixedClock::new(60);
        let mut scheduler = Scheduler::new(secrets(), TotpConfig::default());
        let previous = scheduler.tick(&clock).unwrap().cloned();

        clock.set(None);
        assert!(matches!(
            scheduler.tick(&clock),
            Err(TotpError::ClockUnavailable(_))
        ));
        assert!(scheduler.manual_refresh(&clock).is_err());
        assert_eq!(scheduler.state().cloned(), previous);
        assert_eq!(scheduler.phase(), Phase::Idle);

        // Retried on the next tick.
        clock.set(Some(95));
        assert!(scheduler.tick(&clock).unwrap().is_some());
    }

    #[test]
    fn test_malformed_secret_isolation() {
        let mut list = secrets();
        list.insert(1, Secret::new("broken", "NOT-BASE32"));
        list.push(Secret::new("huge", "A".repeat(112)));
        let mut scheduler = Scheduler::new(list, TotpConfig::default());

        let state = scheduler.refresh(59, Trigger::Startup);
        assert_eq!(state.entries().len(), 5);
        assert_eq!(state.error_count(), 2);
        assert_eq!(state.entries()[1].name(), "broken");
        assert!(matches!(
            state.entries()[1].code(),
            EntryCode::Error(TotpError::InvalidBase32Character { .. })
        ));
        assert_eq!(state.entries()[1].code().to_string(), "ERROR");
        assert!(matches!(
            state.entries()[4].code(),
            EntryCode::Error(TotpError::KeyTooLong { .. })
        ));
        assert_eq!(state.entries()[2].name(), "github");
        assert!(!state.entries()[2].code().is_error());
    }

    #[test]
    fn test_all_secrets_failing() {
        let mut scheduler = Scheduler::new(
            vec![Secret::new("broken", "0000")],
            TotpConfig::default(),
        );

        let state = scheduler.refresh(100, Trigger::Startup);
        assert_eq!(state.error_count(), 1);
        assert_eq!(state.seconds_remaining(), 20);

        let mut empty = Scheduler::new(Vec::new(), TotpConfig::default());
        let state = empty.refresh(100, Trigger::Startup);
        assert!(state.entries().is_empty());
        assert_eq!(state.seconds_remaining(), 20);
    }

    #[test]
    fn test_local_time() {
        let mut scheduler = Scheduler::new(secrets(), TotpConfig::default());
        let state = scheduler.refresh(1_700_000_000, Trigger::Startup);
        let offset = FixedOffset::east_opt(3600).unwrap();

        let local = state.local_time(offset).unwrap();
        assert_eq!(local.format("%Y-%m-%d %H:%M").to_string(), "2023-11-14 23:13");
    }

    #[test]
    fn test_secret_debug_redacted() {
        let secret = Secret::new("github", "JBSWY3DPEHPK3PXP");
        let debug = format!("{secret:?}");

        assert!(debug.contains("github"));
        assert!(!debug.contains("JBSWY3DPEHPK3PXP"));
    }
}
