//! Logging bootstrap for cmdvisor binaries.
//!
//! Library crates only emit `tracing` events under dotted targets (see [`TARGETS`]); binaries
//! call [`logger_init`] once at startup.
//!
//! ```rust,no_run
//! use cmdvisor_observe::{LoggerConfig, LoggerFormat, logger_init};
//!
//! # fn main() -> Result<(), cmdvisor_observe::LoggerError> {
//! let cfg = LoggerConfig::default()
//!     .with_format(LoggerFormat::Json)
//!     .with_level_from_env("CMDVISOR_LOG")
//!     .with_watchdog_level("debug")
//!     .with_run_timing(true);
//! logger_init(&cfg)?;
//! # Ok(())
//! # }
//! ```
mod config;
mod error;
mod filter;
mod init;

pub use config::{LoggerConfig, LoggerFormat};
pub use error::LoggerError;
pub use filter::{TARGETS, directives};
pub use init::logger_init;
