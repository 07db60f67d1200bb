//! Logging for the election terminal.
//!
//! Log lines go to `stderr` so they never mix with command output on
//! `stdout`. `LOG_LEVEL` sets the level for this crate and the API client;
//! `RUST_LOG` overrides it with full [`EnvFilter`] syntax.

use tracing_subscriber::{prelude::*, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

/// Crates whose events are shown at `LOG_LEVEL` by default. Everything else
/// (reqwest, hyper) stays at the filter's default of `error`.
const LOGGED_CRATES: [&str; 2] = [env!("CARGO_PKG_NAME"), "election-api-client"];

fn env_filter(level: tracing::Level) -> color_eyre::Result<EnvFilter> {
    let mut filter = EnvFilter::builder().from_env_lossy();
    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_none() {
        for name in LOGGED_CRATES {
            filter = filter.add_directive(format!("{}={level}", name.replace('-', "_")).parse()?);
        }
    }
    Ok(filter)
}

/// Installs the error report handler and the log subscriber. Call once,
/// before anything logs.
pub(crate) fn setup(config: &Config) -> color_eyre::Result<()> {
    color_eyre::install()?;
    let stderr_log = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);
    tracing_subscriber::registry()
        .with(env_filter(config.log_level)?)
        .with(stderr_log)
        .init();
    Ok(())
}
