//! Tracing subscriber setup
//!
//! Library code only emits `tracing` events; applications call
//! [`init_tracing`] once to print them.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

use crate::config::LoggingConfig;
use crate::error::LoggingError;

/// Build the event filter: `RUST_LOG` if set and non-empty, otherwise the
/// configured directives.
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, LoggingError> {
    let directives = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(env) if !env.trim().is_empty() => env,
        _ => config.filter.clone(),
    };
    Ok(EnvFilter::try_new(directives)?)
}

/// Install a global fmt subscriber configured by `config`.
///
/// # Errors
///
/// Returns an error if the filter does not parse or a global subscriber has
/// already been set.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = build_filter(config)?;
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_ansi(config.ansi)
        .with_target(config.with_target);

    Registry::default().with(filter).with(fmt_layer).try_init()?;
    Ok(())
}
