use std::{
    process::ExitStatus,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use tracing::{debug, info, instrument, trace, warn};

use crate::{
    command::{CommandSetup, CommandSpec},
    config::RunnerConfig,
    error::{ConfigError, RunError},
    metrics::{NoopMetrics, RunFinish, RunnerMetrics},
    signal::{ProcessGroupSignaller, Signal, Signaller},
    table::SlotTable,
};

/// Bounded command runner.
///
/// Owns a fixed table of slots, one per concurrently running command. Commands are launched
/// with [`Runner::run`]; timeouts and shutdown are enforced by the watchdog started with
/// [`Runner::spawn_watchdog`].
pub struct Runner {
    pub(crate) cfg: RunnerConfig,
    pub(crate) table: Mutex<SlotTable>,
    pub(crate) signaller: Arc<dyn Signaller>,
    pub(crate) metrics: Arc<dyn RunnerMetrics>,
}

impl Runner {
    /// Build a runner that signals real process groups and records no metrics.
    pub fn new(cfg: RunnerConfig) -> Result<Self, ConfigError> {
        Self::with_parts(cfg, Arc::new(ProcessGroupSignaller), Arc::new(NoopMetrics))
    }

    /// Build a runner with explicit signal delivery and metrics backends.
    pub fn with_parts(
        cfg: RunnerConfig,
        signaller: Arc<dyn Signaller>,
        metrics: Arc<dyn RunnerMetrics>,
    ) -> Result<Self, ConfigError> {
        let cfg = cfg.clamped()?;
        debug!(
            target: "cmdvisor.core.runner",
            capacity = cfg.capacity,
            check_ms = cfg.check_interval.as_millis() as u64,
            drain_grace_ms = cfg.drain_grace.as_millis() as u64,
            "runner created"
        );
        Ok(Self {
            table: Mutex::new(SlotTable::new(cfg.capacity)),
            cfg,
            signaller,
            metrics,
        })
    }

    /// Replace the metrics backend.
    pub fn with_metrics(mut self, metrics: Arc<dyn RunnerMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Effective (clamped) configuration.
    #[inline]
    pub fn config(&self) -> &RunnerConfig {
        &self.cfg
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.cfg.capacity
    }

    /// Number of occupied slots.
    pub fn running(&self) -> usize {
        self.lock().occupied()
    }

    /// Stop accepting commands and start the collective grace window.
    ///
    /// Only the first call has an effect.
    pub fn begin_drain(&self) {
        let mut table = self.lock();
        if table.begin_drain(Instant::now(), self.cfg.drain_grace) {
            info!(
                target: "cmdvisor.core.runner",
                running = table.occupied(),
                grace_ms = self.cfg.drain_grace.as_millis() as u64,
                "drain started; no new commands accepted"
            );
        }
    }

    pub fn is_draining(&self) -> bool {
        self.lock().drain_at().is_some()
    }

    /// `true` iff no slot is occupied.
    pub fn all_instances_released(&self) -> bool {
        self.lock().is_empty()
    }

    /// Run a command to completion under the runner's supervision.
    ///
    /// Setup callbacks are applied in order to the process description; the process is then
    /// started in a new process group and awaited. The slot is released on every path.
    #[instrument(
        target = "cmdvisor.core.run",
        name = "run",
        level = "debug",
        skip_all,
        fields(program = %spec.program, timeout_ms = spec.timeout.as_millis() as u64)
    )]
    pub async fn run(
        &self,
        spec: &CommandSpec,
        setups: &mut [&mut dyn CommandSetup],
    ) -> Result<ExitStatus, RunError> {
        let mut lease = self.allocate()?;

        let mut cmd = spec.to_command();
        for (index, setup) in setups.iter_mut().enumerate() {
            if let Err(source) = setup.setup(&mut cmd) {
                debug!(target: "cmdvisor.core.run", index, error = %source, "setup callback failed");
                self.metrics.record_finished(RunFinish::SetupFailed);
                return Err(RunError::SetupFailed { index, source });
            }
        }

        #[cfg(unix)]
        cmd.process_group(0);
        // If the caller drops this future the slot is released, so nothing would watch the
        // child anymore.
        cmd.kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                debug!(target: "cmdvisor.core.run", error = %e, "spawn failed");
                self.metrics.record_finished(RunFinish::SpawnFailed);
                return Err(RunError::Spawn(e));
            }
        };

        // A child that already exited and was reaped has no id; the wait below returns at once.
        if let Some(pid) = child.id() {
            lease.mark_started(pid as i32, spec.timeout);
        }
        self.metrics.record_started();
        trace!(target: "cmdvisor.core.run", pid = ?child.id(), slot = lease.index, "process started");

        let status = child.wait().await;
        if status.is_ok() {
            lease.reaped();
        }
        drop(lease);

        match status {
            Ok(status) => {
                let finish = if status.success() {
                    RunFinish::Success
                } else {
                    RunFinish::Failure
                };
                self.metrics.record_finished(finish);
                debug!(target: "cmdvisor.core.run", %status, "process exited");
                Ok(status)
            }
            Err(e) => {
                warn!(target: "cmdvisor.core.run", error = %e, "waiting for process failed");
                self.metrics.record_finished(RunFinish::WaitFailed);
                Err(RunError::Wait(e))
            }
        }
    }

    pub(crate) fn allocate(&self) -> Result<Lease<'_>, RunError> {
        let allocated = self.lock().allocate();
        match allocated {
            Ok(index) => Ok(Lease {
                runner: self,
                index,
                reaped: false,
            }),
            Err(e) => {
                debug!(target: "cmdvisor.core.runner", reason = e.kind(), "command rejected");
                self.metrics.record_rejected(e.kind());
                Err(e)
            }
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, SlotTable> {
        // The table holds plain data; a panic elsewhere cannot leave it half-updated.
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Claimed slot; releases itself on drop.
///
/// A lease dropped while its process may still run (the `run` future was abandoned) kills the
/// whole process group first, since nothing would watch it afterwards.
pub(crate) struct Lease<'a> {
    runner: &'a Runner,
    pub(crate) index: usize,
    reaped: bool,
}

impl Lease<'_> {
    /// Publish the process and its deadline; from now on the watchdog considers it.
    pub(crate) fn mark_started(&self, pgid: i32, timeout: Duration) {
        let now = Instant::now();
        let deadline = now.checked_add(timeout).unwrap_or_else(far_future);
        self.runner.lock().mark_started(self.index, pgid, deadline);
    }

    /// The process was waited for; dropping the lease only frees the slot.
    pub(crate) fn reaped(&mut self) {
        self.reaped = true;
    }
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        let pgid = {
            let mut table = self.runner.lock();
            let pgid = table.pgid(self.index);
            table.release(self.index);
            pgid
        };

        let Some(pgid) = pgid.filter(|_| !self.reaped) else {
            return;
        };
        let delivered = match self.runner.signaller.signal_group(pgid, Signal::Kill) {
            Ok(()) => true,
            Err(e) => {
                debug!(target: "cmdvisor.core.run", pgid, error = %e, "killing abandoned process group failed");
                false
            }
        };
        self.runner.metrics.record_signal(Signal::Kill, delivered);
        debug!(target: "cmdvisor.core.run", slot = self.index, pgid, "run abandoned; process group killed");
    }
}

fn far_future() -> Instant {
    // roughly 30 years; only reached with absurd timeouts such as `Duration::MAX`
    Instant::now() + Duration::from_secs(30 * 365 * 24 * 60 * 60)
}
