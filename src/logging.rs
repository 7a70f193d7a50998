//! Log output setup
//!
//! The library itself only emits `tracing` events. Binaries and test
//! harnesses call [`init`] once to install a subscriber.

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{LogConfig, LogFormat};
use crate::{Error, Result};

/// Install the global `tracing` subscriber described by `config`.
///
/// # Errors
///
/// Returns `Validation` if `config.level` is not a valid filter directive or
/// a global subscriber is already installed.
pub fn init(config: &LogConfig) -> Result<()> {
    let filter = filter(config)?;
    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match config.format {
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_span_events(span_events))
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_span_events(span_events))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_span_events(span_events))
            .try_init(),
    };
    installed.map_err(|e| Error::invalid("log", e.to_string()))
}

/// Build the level filter for `config`.
///
/// # Errors
///
/// Returns `Validation` naming `log.level` for an unparsable directive.
pub fn filter(config: &LogConfig) -> Result<EnvFilter> {
    EnvFilter::try_new(&config.level).map_err(|e| Error::invalid("log.level", e.to_string()))
}
