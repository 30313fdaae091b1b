use std::{fmt, io::IsTerminal, str::FromStr};

use crate::error::LoggerError;

/// Output format of the global subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoggerFormat {
    #[default]
    Text,
    Json,
    /// systemd journal; needs Linux and the `journald` feature.
    Journald,
}

impl LoggerFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoggerFormat::Text => "text",
            LoggerFormat::Json => "json",
            LoggerFormat::Journald => "journald",
        }
    }
}

impl fmt::Display for LoggerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoggerFormat {
    type Err = LoggerError;

    /// Availability of journald is checked by [`crate::logger_init`], not here.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LoggerFormat::Text),
            "json" => Ok(LoggerFormat::Json),
            "journald" | "journal" => Ok(LoggerFormat::Journald),
            _ => Err(LoggerError::InvalidFormat(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    /// Base `EnvFilter` directive, e.g. `"info"` or `"warn,cmdvisor.exec=debug"`.
    pub level: String,
    /// Override for `cmdvisor.core.watchdog`, which logs every escalation at `debug`.
    pub watchdog_level: Option<String>,
    /// Log each finished `run` span with its busy and idle time.
    pub run_timing: bool,
    pub with_targets: bool,
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::Text,
            level: "info".to_string(),
            watchdog_level: None,
            run_timing: false,
            with_targets: true,
            use_color: std::io::stdout().is_terminal(),
        }
    }
}

impl LoggerConfig {
    pub fn with_format(mut self, format: LoggerFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Level from the environment variable `var`, falling back to the current one.
    pub fn with_level_from_env(self, var: &str) -> Self {
        match std::env::var(var) {
            Ok(level) if !level.trim().is_empty() => self.with_level(level),
            _ => self,
        }
    }

    pub fn with_watchdog_level(mut self, level: impl Into<String>) -> Self {
        self.watchdog_level = Some(level.into());
        self
    }

    pub fn with_run_timing(mut self, enabled: bool) -> Self {
        self.run_timing = enabled;
        self
    }

    pub fn with_color(mut self, enabled: bool) -> Self {
        self.use_color = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_text_at_info() {
        let cfg = LoggerConfig::default();
        assert_eq!(cfg.format, LoggerFormat::Text);
        assert_eq!(cfg.level, "info");
        assert_eq!(cfg.watchdog_level, None);
        assert!(!cfg.run_timing);
        assert!(cfg.with_targets);
    }

    #[test]
    fn missing_env_keeps_level() {
        let cfg = LoggerConfig::default()
            .with_level("warn")
            .with_level_from_env("CMDVISOR_TEST_SURELY_UNSET_LOG_VAR");
        assert_eq!(cfg.level, "warn");
    }

    #[test]
    fn parses_formats_case_insensitively() {
        assert_eq!(" JSON ".parse::<LoggerFormat>().unwrap(), LoggerFormat::Json);
        assert_eq!("journal".parse::<LoggerFormat>().unwrap(), LoggerFormat::Journald);
        assert_eq!(LoggerFormat::Journald.to_string(), "journald");
    }

    #[test]
    fn rejects_unknown_format() {
        let err = "yaml".parse::<LoggerFormat>().unwrap_err();
        assert!(matches!(err, LoggerError::InvalidFormat(ref s) if s == "yaml"));
    }
}
