use tracing_subscriber::EnvFilter;

use crate::{config::LoggerConfig, error::LoggerError};

/// Event targets emitted by the cmdvisor crates.
pub const TARGETS: [&str; 5] = [
    "cmdvisor.core.runner",
    "cmdvisor.core.run",
    "cmdvisor.core.watchdog",
    "cmdvisor.exec.output",
    "cmdvisor.exec.limits",
];

const WATCHDOG_TARGET: &str = "cmdvisor.core.watchdog";
const RUN_TARGET: &str = "cmdvisor.core.run";

/// The `EnvFilter` directive string `cfg` stands for.
///
/// Run timing needs the `debug`-level `run` span enabled, so it raises that target to `debug`.
pub fn directives(cfg: &LoggerConfig) -> String {
    let mut out = cfg.level.trim().to_string();
    let mut push = |directive: String| {
        if !out.is_empty() {
            out.push(',');
        }
        out.push_str(&directive);
    };

    if let Some(level) = &cfg.watchdog_level {
        push(format!("{WATCHDOG_TARGET}={}", level.trim()));
    }
    if cfg.run_timing {
        push(format!("{RUN_TARGET}=debug"));
    }
    out
}

pub(crate) fn build(cfg: &LoggerConfig) -> Result<EnvFilter, LoggerError> {
    let directive = directives(cfg);
    EnvFilter::try_new(&directive)
        .map_err(|source| LoggerError::InvalidFilter { directive, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_level_is_kept() {
        let cfg = LoggerConfig::default().with_level("warn");
        assert_eq!(directives(&cfg), "warn");
    }

    #[test]
    fn watchdog_and_run_overrides_are_appended() {
        let cfg = LoggerConfig::default()
            .with_level("info")
            .with_watchdog_level(" trace ")
            .with_run_timing(true);
        assert_eq!(
            directives(&cfg),
            "info,cmdvisor.core.watchdog=trace,cmdvisor.core.run=debug"
        );
        assert!(build(&cfg).is_ok());
    }

    #[test]
    fn overrides_alone_form_a_valid_filter() {
        let cfg = LoggerConfig::default()
            .with_level("")
            .with_watchdog_level("debug");
        assert_eq!(directives(&cfg), "cmdvisor.core.watchdog=debug");
        assert!(build(&cfg).is_ok());
    }

    #[test]
    fn every_target_is_a_valid_directive() {
        for target in TARGETS {
            let cfg = LoggerConfig::default().with_level(format!("warn,{target}=debug"));
            assert!(build(&cfg).is_ok(), "{target}");
        }
    }

    #[test]
    fn invalid_directive_is_reported_with_its_text() {
        let cfg = LoggerConfig::default().with_watchdog_level("loud");
        match build(&cfg).unwrap_err() {
            LoggerError::InvalidFilter { directive, .. } => {
                assert_eq!(directive, "info,cmdvisor.core.watchdog=loud");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
