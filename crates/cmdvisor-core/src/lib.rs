//! Bounded, watchdog-supervised execution of external commands.
//!
//! A [`Runner`] owns a fixed number of slots. Each [`Runner::run`] call claims one, starts the
//! command in its own process group and waits for it. A background watchdog
//! ([`Runner::spawn_watchdog`]) escalates commands that outlive their timeout with SIGINT, then
//! SIGTERM, then SIGKILL, all sent to the whole process group. Cancelling the watchdog's token
//! begins a drain: new commands are rejected and, once the grace window expires, every running
//! command is escalated.
//!
//! ```rust,no_run
//! use std::{sync::Arc, time::Duration};
//!
//! use cmdvisor_core::{CommandSpec, Runner, RunnerConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let runner = Arc::new(Runner::new(RunnerConfig::default().with_capacity(2))?);
//! let cancel = CancellationToken::new();
//! let watchdog = runner.spawn_watchdog(cancel.clone());
//!
//! let spec = CommandSpec::new("sleep", Duration::from_secs(7))
//!     .arg("5")
//!     .env("PATH=/usr/bin:/bin");
//! let status = runner.run(&spec, &mut []).await?;
//! println!("{status}");
//!
//! cancel.cancel();
//! watchdog.await?;
//! # Ok(())
//! # }
//! ```

mod command;
mod config;
mod error;
mod escalation;
mod metrics;
mod runner;
mod signal;
mod table;
mod watchdog;

#[cfg(test)]
mod testing;

pub use command::{CommandSetup, CommandSpec};
pub use config::{MIN_CHECK_INTERVAL, MIN_WAIT_WINDOW, RunnerConfig, StopMode};
pub use error::{BoxError, ConfigError, RunError};
pub use metrics::{NoopMetrics, RunFinish, RunnerMetrics};
pub use runner::Runner;
pub use signal::{ProcessGroupSignaller, Signal, Signaller};
pub use watchdog::TickReport;

pub use tokio::process::Command;

pub mod prelude {
    pub use crate::{CommandSetup, CommandSpec, RunError, Runner, RunnerConfig, StopMode};
}
