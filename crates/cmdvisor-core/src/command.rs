use std::{path::PathBuf, time::Duration};

use tokio::process::Command;

use crate::error::BoxError;

/// Description of a command to run under the runner.
#[derive(Clone, Debug)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory; `None` inherits the runner's.
    pub cwd: Option<PathBuf>,
    /// Complete child environment as `KEY=VALUE` entries.
    ///
    /// The ambient environment is never merged in: callers must pass everything the child
    /// needs, including `PATH`.
    pub env: Vec<String>,
    /// Time after start at which the watchdog starts escalating.
    pub timeout: Duration,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
            timeout,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory. An empty path means "inherit".
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        let cwd = cwd.into();
        self.cwd = (!cwd.as_os_str().is_empty()).then_some(cwd);
        self
    }

    pub fn env(mut self, entry: impl Into<String>) -> Self {
        self.env.push(entry.into());
        self
    }

    pub fn envs<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.env.extend(entries.into_iter().map(Into::into));
        self
    }

    /// Build the process description handed to setup callbacks.
    pub(crate) fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        cmd.env_clear();
        for entry in &self.env {
            let (key, value) = split_env(entry);
            cmd.env(key, value);
        }
        cmd
    }
}

/// Split a `KEY=VALUE` entry at the first `=`; an entry without one gets an empty value.
fn split_env(entry: &str) -> (&str, &str) {
    entry.split_once('=').unwrap_or((entry, ""))
}

/// Hook run against the process description before the process is started.
///
/// Setup callbacks may redirect output, add environment, install `pre_exec` hooks and so on.
/// Returning an error aborts the launch.
pub trait CommandSetup: Send {
    fn setup(&mut self, cmd: &mut Command) -> Result<(), BoxError>;
}

impl<F> CommandSetup for F
where
    F: FnMut(&mut Command) -> Result<(), BoxError> + Send,
{
    fn setup(&mut self, cmd: &mut Command) -> Result<(), BoxError> {
        self(cmd)
    }
}
