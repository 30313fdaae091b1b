use time::{UtcOffset, format_description::well_known::Rfc3339};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, format::FmtSpan, time::OffsetTime},
    layer::{Layered, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::{
    config::{LoggerConfig, LoggerFormat},
    error::LoggerError,
    filter,
};

type Filtered = Layered<EnvFilter, Registry>;

/// Install the global `tracing` subscriber described by `cfg`.
///
/// Fails with [`LoggerError::AlreadyInitialized`] when a global subscriber is already set.
pub fn logger_init(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    if tracing::dispatcher::has_been_set() {
        return Err(LoggerError::AlreadyInitialized);
    }
    let filter = filter::build(cfg)?;

    match cfg.format {
        LoggerFormat::Text => {
            let layer = fmt::layer()
                .with_ansi(cfg.use_color)
                .with_target(cfg.with_targets)
                .with_timer(timer())
                .with_span_events(span_events(cfg));
            install(filter, layer)
        }
        LoggerFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .with_target(cfg.with_targets)
                .with_timer(timer())
                .with_span_events(span_events(cfg));
            install(filter, layer)
        }
        LoggerFormat::Journald => journald(filter),
    }
}

fn install<L>(filter: EnvFilter, layer: L) -> Result<(), LoggerError>
where
    L: Layer<Filtered> + Send + Sync + 'static,
{
    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()?;
    Ok(())
}

fn timer() -> OffsetTime<Rfc3339> {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetTime::new(offset, Rfc3339)
}

fn span_events(cfg: &LoggerConfig) -> FmtSpan {
    if cfg.run_timing {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    }
}

#[cfg(all(target_os = "linux", feature = "journald"))]
fn journald(filter: EnvFilter) -> Result<(), LoggerError> {
    let layer = tracing_journald::layer().map_err(LoggerError::Journald)?;
    install(filter, layer)
}

#[cfg(not(all(target_os = "linux", feature = "journald")))]
fn journald(_filter: EnvFilter) -> Result<(), LoggerError> {
    Err(LoggerError::JournaldNotSupported)
}
