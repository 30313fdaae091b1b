//! Process-group signal delivery.
//!
//! Every command is started as the leader of its own process group, so one signal sent to the
//! negated group id reaches the command and everything it forked.

use std::{fmt, io};

/// Escalation signals, in the order the watchdog sends them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Interrupt,
    Terminate,
    Kill,
}

impl Signal {
    /// Conventional signal name, used as a log field and metrics label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Interrupt => "SIGINT",
            Signal::Terminate => "SIGTERM",
            Signal::Kill => "SIGKILL",
        }
    }

    #[cfg(unix)]
    fn as_raw(&self) -> libc::c_int {
        match self {
            Signal::Interrupt => libc::SIGINT,
            Signal::Terminate => libc::SIGTERM,
            Signal::Kill => libc::SIGKILL,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivers escalation signals to a whole process group.
pub trait Signaller: Send + Sync + 'static {
    fn signal_group(&self, pgid: i32, signal: Signal) -> io::Result<()>;
}

/// [`Signaller`] backed by `kill(2)` on the negated process-group id.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessGroupSignaller;

impl Signaller for ProcessGroupSignaller {
    fn signal_group(&self, pgid: i32, signal: Signal) -> io::Result<()> {
        // pgid 0 or 1 would turn into "our own group" or "every process we may signal".
        if pgid <= 1 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("refusing to signal process group {pgid}"),
            ));
        }

        cfg_if::cfg_if! {
            if #[cfg(unix)] {
                let rc = unsafe { libc::kill(-pgid, signal.as_raw()) };
                if rc != 0 {
                    return Err(io::Error::last_os_error());
                }
                Ok(())
            } else {
                let _ = signal;
                Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    "process-group signals are not supported on this platform",
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_names() {
        assert_eq!(Signal::Interrupt.to_string(), "SIGINT");
        assert_eq!(Signal::Terminate.as_str(), "SIGTERM");
        assert_eq!(Signal::Kill.as_str(), "SIGKILL");
    }

    #[test]
    fn refuses_special_group_ids() {
        let s = ProcessGroupSignaller;
        for pgid in [-5, 0, 1] {
            let err = s.signal_group(pgid, Signal::Kill).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        }
    }

    #[cfg(unix)]
    #[test]
    fn missing_group_reports_an_error() {
        // Pid numbers near i32::MAX are never handed out on Linux/macOS defaults.
        let err = ProcessGroupSignaller
            .signal_group(i32::MAX - 7, Signal::Interrupt)
            .unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::ESRCH));
    }
}
