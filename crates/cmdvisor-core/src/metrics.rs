use crate::signal::Signal;

/// How a run finished, as seen by metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunFinish {
    /// Process exited with a zero status.
    Success,
    /// Process exited with a non-zero status or was killed by a signal.
    Failure,
    SetupFailed,
    SpawnFailed,
    WaitFailed,
}

impl RunFinish {
    pub fn as_label(&self) -> &'static str {
        match self {
            RunFinish::Success => "success",
            RunFinish::Failure => "failure",
            RunFinish::SetupFailed => "setup_failed",
            RunFinish::SpawnFailed => "spawn_failed",
            RunFinish::WaitFailed => "wait_failed",
        }
    }
}

/// Observability hook for the runner.
///
/// All methods default to no-ops; implementations must be cheap, they may be called while the
/// slot table lock is held.
pub trait RunnerMetrics: Send + Sync + 'static {
    /// A process was started.
    fn record_started(&self) {}

    /// A run was rejected before a slot was claimed (`"capacity_exceeded"` or `"shutting_down"`).
    fn record_rejected(&self, _reason: &'static str) {}

    /// A run holding a slot has finished.
    fn record_finished(&self, _finish: RunFinish) {}

    /// The watchdog attempted to deliver `signal`; `delivered` is `false` when `kill(2)` failed.
    fn record_signal(&self, _signal: Signal, _delivered: bool) {}
}

/// Metrics backend that records nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl RunnerMetrics for NoopMetrics {}
