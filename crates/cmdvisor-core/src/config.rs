use std::time::Duration;

use crate::error::ConfigError;

/// Lower bound for the watchdog tick period.
pub const MIN_CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// Lower bound for the drain grace window and both escalation wait windows.
pub const MIN_WAIT_WINDOW: Duration = Duration::from_millis(200);

/// What the watchdog does once external cancellation is observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopMode {
    /// Begin the drain and stop ticking right away.
    Immediate,
    /// Begin the drain and keep ticking until every slot is released.
    #[default]
    DrainUntilEmpty,
}

/// Runner configuration.
///
/// Durations below [`MIN_CHECK_INTERVAL`] / [`MIN_WAIT_WINDOW`] are raised to the minimum
/// when the runner is built, so a near-zero configuration cannot turn into a signal storm.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Maximum number of concurrently running commands.
    pub capacity: usize,
    /// Watchdog tick period.
    pub check_interval: Duration,
    /// Collective allowance granted to running commands once the drain begins.
    pub drain_grace: Duration,
    /// Time between SIGINT and SIGTERM.
    pub interrupt_wait: Duration,
    /// Time between SIGTERM and SIGKILL.
    pub terminate_wait: Duration,
    pub stop_mode: StopMode,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            capacity: 4,
            check_interval: Duration::from_secs(1),
            drain_grace: Duration::from_secs(5),
            interrupt_wait: Duration::from_secs(2),
            terminate_wait: Duration::from_secs(5),
            stop_mode: StopMode::default(),
        }
    }
}

impl RunnerConfig {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    pub fn with_drain_grace(mut self, grace: Duration) -> Self {
        self.drain_grace = grace;
        self
    }

    pub fn with_interrupt_wait(mut self, wait: Duration) -> Self {
        self.interrupt_wait = wait;
        self
    }

    pub fn with_terminate_wait(mut self, wait: Duration) -> Self {
        self.terminate_wait = wait;
        self
    }

    pub fn with_stop_mode(mut self, mode: StopMode) -> Self {
        self.stop_mode = mode;
        self
    }

    /// Validate and raise every duration to its floor.
    pub(crate) fn clamped(self) -> Result<Self, ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(Self {
            capacity: self.capacity,
            check_interval: self.check_interval.max(MIN_CHECK_INTERVAL),
            drain_grace: self.drain_grace.max(MIN_WAIT_WINDOW),
            interrupt_wait: self.interrupt_wait.max(MIN_WAIT_WINDOW),
            terminate_wait: self.terminate_wait.max(MIN_WAIT_WINDOW),
            stop_mode: self.stop_mode,
        })
    }
}
