//! Timeout escalation policy: SIGINT, then SIGTERM, then SIGKILL.

use std::time::{Duration, Instant};

use crate::{signal::Signal, table::RunningInstance};

/// Wait windows between escalation stages.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Windows {
    pub interrupt_wait: Duration,
    pub terminate_wait: Duration,
}

/// Whether every started instance must be escalated regardless of its own deadline.
#[inline]
pub(crate) fn collective_deadline_passed(drain_at: Option<Instant>, now: Instant) -> bool {
    drain_at.is_some_and(|at| now >= at)
}

impl RunningInstance {
    /// Decide the next signal for this instance at `now` and record it.
    ///
    /// Returns `None` when the instance is not started, not yet eligible, still inside the
    /// current stage's wait window, or already killed. Every stage is sent at most once.
    pub(crate) fn escalate(
        &mut self,
        now: Instant,
        collective: bool,
        windows: Windows,
    ) -> Option<Signal> {
        let deadline = self.deadline?;
        if self.kill_sent_at.is_some() || (!collective && now < deadline) {
            return None;
        }

        match (self.interrupt_sent_at, self.terminate_sent_at) {
            (None, _) => {
                self.interrupt_sent_at = Some(now);
                Some(Signal::Interrupt)
            }
            (Some(interrupted), None) => {
                if now > interrupted + windows.interrupt_wait {
                    self.terminate_sent_at = Some(now);
                    Some(Signal::Terminate)
                } else {
                    None
                }
            }
            (Some(_), Some(terminated)) => {
                if now > terminated + windows.terminate_wait {
                    self.kill_sent_at = Some(now);
                    Some(Signal::Kill)
                } else {
                    None
                }
            }
        }
    }
}
