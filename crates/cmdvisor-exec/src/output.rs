//! Combined stdout/stderr log file for a single command.
//!
//! Layout of a log file:
//!
//! ```text
//! { ...command info as JSON... }
//!
//! -- (start: 2026-10-18T13:22:05.12+00:00) --------
//!
//! <stdout and stderr of the process>
//!
//! -- (complete: 2026-10-18T13:22:10.13+00:00, cost: 5.01s) --------
//! Result: exit status: 0 (error=none)
//! ```

use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::Path,
    process::{ExitStatus, Stdio},
    time::Instant,
};

use cmdvisor_core::{BoxError, CommandSetup, RunError};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::{error::ExecError, info::CommandInfo};

/// Log file receiving a command's description, its combined output and its result.
///
/// Once closed every method is a no-op.
pub struct CombinedOutputFile {
    file: Option<File>,
    started_at: Option<Instant>,
}

impl CombinedOutputFile {
    /// Open (create or truncate) `path` for writing with the given unix permission bits.
    pub fn open(path: impl AsRef<Path>, mode: u32) -> Result<Self, ExecError> {
        let path = path.as_ref();
        let mut opts = OpenOptions::new();
        opts.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            opts.mode(mode);
        }
        #[cfg(not(unix))]
        let _ = mode;

        let file = opts.open(path).map_err(ExecError::Open)?;
        debug!(target: "cmdvisor.exec.output", path = %path.display(), "output file opened");
        Ok(Self {
            file: Some(file),
            started_at: None,
        })
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    /// Write the command description and start marker, then redirect stdout and stderr here.
    pub fn setup_command(&mut self, cmd: &mut Command) -> Result<(), ExecError> {
        let Some(file) = self.file.as_mut() else {
            return Ok(());
        };

        CommandInfo::from_command(cmd).write_pretty(&mut *file)?;
        self.started_at = Some(Instant::now());
        write!(file, "\n-- (start: {}) --------\n\n", timestamp())?;
        file.flush()?;

        cmd.stdout(Stdio::from(file.try_clone()?));
        cmd.stderr(Stdio::from(file.try_clone()?));
        Ok(())
    }

    /// Append the completion marker and the outcome of the run.
    ///
    /// Write failures are logged and otherwise ignored; the run itself has already finished.
    pub fn log_result(&mut self, result: &Result<ExitStatus, RunError>) {
        let Some(file) = self.file.as_mut() else {
            return;
        };

        let cost = self.started_at.map(|t| t.elapsed()).unwrap_or_default();
        let (status, error) = match result {
            Ok(status) => (status.to_string(), "none".to_string()),
            Err(e) => ("none".to_string(), e.to_string()),
        };

        let written = write!(
            file,
            "\n\n-- (complete: {}, cost: {cost:?}) --------\nResult: {status} (error={error})\n",
            timestamp()
        )
        .and_then(|_| file.flush());
        if let Err(e) = written {
            warn!(target: "cmdvisor.exec.output", error = %e, "failed to write run result");
        }
    }

    /// Flush and close the file.
    pub fn close(&mut self) -> Result<(), ExecError> {
        if let Some(file) = self.file.take() {
            file.sync_all()?;
        }
        Ok(())
    }
}

impl CommandSetup for CombinedOutputFile {
    fn setup(&mut self, cmd: &mut Command) -> Result<(), BoxError> {
        self.setup_command(cmd).map_err(Into::into)
    }
}

fn timestamp() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(&Rfc3339).unwrap_or_else(|_| now.to_string())
}
