use std::io::Write;
use std::time::Duration;

use badger_totp::clock::SystemClock;
use badger_totp::config::Configuration;
use badger_totp::scheduler::{RefreshState, Scheduler};
use badger_totp::telemetry;
use tokio::time::MissedTickBehavior;

const DEFAULT_LOG_LEVEL: &str = "info";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::setup_logging(DEFAULT_LOG_LEVEL)?;
    telemetry::describe_metrics();

    // read configuration file. `CONFIG_PATH` overrides `config.yaml`.
    let mut config = Configuration::default();
    if let Ok(path) = std::env::var("CONFIG_PATH") {
        config = config.path(path.into());
    }
    let config = config.read()?;

    if config.secrets.is_empty() {
        tracing::warn!("no secret configured, nothing to display");
    }
    tracing::info!(
        version = config.version(),
        secrets = config.secrets.len(),
        step = config.totp.step(),
        digits = config.totp.digits(),
        "starting authenticator"
    );

    let clock = SystemClock::new();
    let mut scheduler = Scheduler::new(config.secrets.clone(), config.totp);

    // Failures are logged by the scheduler, the next tick retries.
    if let Ok(state) = scheduler.manual_refresh(&clock) {
        render(&config, state)?;
    }

    let mut interval = tokio::time::interval(Duration::from_secs(config.poll_interval));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut manual = ManualRefresh::new()?;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Ok(Some(state)) = scheduler.tick(&clock) {
                    render(&config, state)?;
                }
            },
            Some(()) = manual.recv() => {
                tracing::info!("manual refresh requested");
                if let Ok(state) = scheduler.manual_refresh(&clock) {
                    render(&config, state)?;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                break;
            },
        }
    }

    Ok(())
}

/// Print the header, one `CODE : name` line per entry, then the local
/// date and time.
fn render(config: &Configuration, state: &RefreshState) -> std::io::Result<()> {
    let mut out = std::io::stdout().lock();

    writeln!(
        out,
        "{} | Time to refresh : {} S",
        config.name,
        state.seconds_remaining()
    )?;
    for entry in state.entries() {
        writeln!(out, "{} : {}", entry.code(), entry.name())?;
    }
    if let Some(local) = config.timezone().and_then(|tz| state.local_time(tz)) {
        writeln!(out, "{}  {}", local.format("%Y-%m-%d"), local.format("%H:%M"))?;
    }

    out.flush()
}

/// SIGUSR1 stands for the badge refresh button.
#[cfg(unix)]
struct ManualRefresh(tokio::signal::unix::Signal);

#[cfg(unix)]
impl ManualRefresh {
    fn new() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self(signal(SignalKind::user_defined1())?))
    }

    async fn recv(&mut self) -> Option<()> {
        self.0.recv().await
    }
}

#[cfg(not(unix))]
struct ManualRefresh;

#[cfg(not(unix))]
impl ManualRefresh {
    fn new() -> std::io::Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) -> Option<()> {
        std::future::pending().await
    }
}
