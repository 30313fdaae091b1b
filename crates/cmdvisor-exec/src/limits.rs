//! POSIX rlimit-based resource limits as a setup callback.
//!
//! On Unix the limits are applied inside a `pre_exec` hook, which runs in the child after
//! `fork()` and right before `execve()`, so the command never runs unrestricted.
//! On other platforms the request is logged and ignored.
use cmdvisor_core::{BoxError, CommandSetup};
use tokio::process::Command;
#[cfg(not(unix))]
use tracing::warn;

/// Declarative rlimits for a child process.
///
/// `None` leaves the inherited limit unchanged.
#[derive(Debug, Clone, Default)]
pub struct RlimitConfig {
    /// `RLIMIT_NOFILE`.
    pub max_open_files: Option<u64>,

    /// `RLIMIT_FSIZE`. Growing a file past it usually ends the process with `SIGXFSZ`.
    pub max_file_size_bytes: Option<u64>,

    /// `RLIMIT_CPU`, in seconds of CPU time. Complements the wall-clock timeout of the runner.
    pub max_cpu_seconds: Option<u64>,

    /// Set `RLIMIT_CORE` to zero.
    pub disable_core_dumps: bool,
}

impl RlimitConfig {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.max_open_files.is_none()
            && self.max_file_size_bytes.is_none()
            && self.max_cpu_seconds.is_none()
            && !self.disable_core_dumps
    }
}

/// Install `config` on `cmd`.
pub fn attach_rlimits(cmd: &mut Command, config: &RlimitConfig) {
    if config.is_empty() {
        return;
    }

    #[cfg(unix)]
    {
        unix_impl::attach_rlimits(cmd, config);
    }

    #[cfg(not(unix))]
    {
        let _ = cmd;
        warn!(
            target: "cmdvisor.exec.limits",
            ?config,
            "rlimit-based process limits requested on a non-Unix OS; limits will be ignored"
        );
    }
}

impl CommandSetup for RlimitConfig {
    fn setup(&mut self, cmd: &mut Command) -> Result<(), BoxError> {
        attach_rlimits(cmd, self);
        Ok(())
    }
}

#[cfg(unix)]
mod unix_impl {
    use std::io;

    use tokio::process::Command;

    use super::RlimitConfig;

    pub fn attach_rlimits(cmd: &mut Command, config: &RlimitConfig) {
        let limits = [
            (libc::RLIMIT_NOFILE, config.max_open_files),
            (libc::RLIMIT_FSIZE, config.max_file_size_bytes),
            (libc::RLIMIT_CPU, config.max_cpu_seconds),
            (libc::RLIMIT_CORE, config.disable_core_dumps.then_some(0)),
        ];

        // only async-signal-safe calls past this point: the closure runs between fork and exec
        unsafe {
            cmd.pre_exec(move || {
                for (resource, value) in limits {
                    let Some(value) = value else { continue };
                    let rlim = libc::rlimit {
                        rlim_cur: value as libc::rlim_t,
                        rlim_max: value as libc::rlim_t,
                    };
                    if libc::setrlimit(resource, &rlim) != 0 {
                        return Err(io::Error::last_os_error());
                    }
                }
                Ok(())
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_is_noop() {
        let mut config = RlimitConfig::default();
        assert!(config.is_empty());

        let mut cmd = Command::new("sh");
        config.setup(&mut cmd).unwrap();
    }

    #[test]
    fn any_limit_makes_config_non_empty() {
        let cpu = RlimitConfig {
            max_cpu_seconds: Some(5),
            ..Default::default()
        };
        let core = RlimitConfig {
            disable_core_dumps: true,
            ..Default::default()
        };
        assert!(!cpu.is_empty());
        assert!(!core.is_empty());
    }
}
