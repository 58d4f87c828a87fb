//! Telemetry logic.
//! Support logging and in-process metrics.
use metrics::Unit;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins over `default_level` when set.
pub fn setup_logging(default_level: &str) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_target(true),
        )
        .try_init()
}

/// Describe metrics emitted by the scheduler.
///
/// Nothing is exported unless the host installs a recorder.
pub fn describe_metrics() {
    metrics::describe_counter!(
        "totp_refresh_total",
        Unit::Count,
        "Number of code refreshes, by trigger."
    );
    metrics::describe_counter!(
        "totp_secret_errors_total",
        Unit::Count,
        "Secrets which could not produce a code."
    );
    metrics::describe_gauge!(
        "totp_seconds_remaining",
        Unit::Seconds,
        "Validity left for the displayed codes."
    );
}
