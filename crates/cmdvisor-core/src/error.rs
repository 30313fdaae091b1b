use thiserror::Error;

/// Boxed error returned by setup callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Outcome of a failed [`Runner::run`](crate::Runner::run) call.
///
/// None of these are retried by the runner; retry policy belongs to the caller.
#[derive(Error, Debug)]
pub enum RunError {
    /// Every slot is occupied.
    #[error("exceeded maximum number of running commands")]
    CapacityExceeded,
    /// The runner is draining and no longer accepts commands.
    #[error("runner is shutting down; no new commands accepted")]
    ShuttingDown,
    /// A setup callback rejected the command; the process was never started.
    #[error("failed at [{index}-th] command setup function: {source}")]
    SetupFailed {
        index: usize,
        #[source]
        source: BoxError,
    },
    /// The OS refused to create the process.
    #[error("spawn failed: {0}")]
    Spawn(#[source] std::io::Error),
    /// Waiting for the process failed at the OS level.
    #[error("wait failed: {0}")]
    Wait(#[source] std::io::Error),
}

impl RunError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            RunError::CapacityExceeded => "capacity_exceeded",
            RunError::ShuttingDown => "shutting_down",
            RunError::SetupFailed { .. } => "setup_failed",
            RunError::Spawn(_) => "spawn",
            RunError::Wait(_) => "wait",
        }
    }
}

/// Invalid [`RunnerConfig`](crate::RunnerConfig).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("capacity must be at least 1")]
    ZeroCapacity,
}
