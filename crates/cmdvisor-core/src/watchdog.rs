//! Periodic timeout enforcement.
//!
//! One background task per runner. Each tick takes the slot-table lock once, scans every started
//! instance and escalates the ones that are eligible: past their own deadline, or past the
//! collective drain deadline.

use std::{sync::Arc, time::Instant};

use tokio::{
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::{
    config::StopMode,
    escalation::{Windows, collective_deadline_passed},
    runner::Runner,
    signal::Signal,
};

/// What a single watchdog tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Signals attempted during the tick, with their target process group.
    pub sent: Vec<(i32, Signal)>,
    /// How many of those deliveries failed.
    pub failed: usize,
}

impl TickReport {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sent.is_empty()
    }
}

impl Runner {
    /// Run one watchdog pass now.
    pub fn tick(&self) -> TickReport {
        self.tick_at(Instant::now())
    }

    pub(crate) fn tick_at(&self, now: Instant) -> TickReport {
        let windows = Windows {
            interrupt_wait: self.cfg.interrupt_wait,
            terminate_wait: self.cfg.terminate_wait,
        };
        let mut report = TickReport::default();

        let mut table = self.lock();
        let collective = collective_deadline_passed(table.drain_at(), now);

        for (slot, inst) in table.started_mut() {
            let Some(pgid) = inst.pgid else { continue };
            let Some(signal) = inst.escalate(now, collective, windows) else {
                continue;
            };

            // Delivery failures are expected: the process may exit between the scan and the
            // signal. They are counted, never propagated.
            let delivered = match self.signaller.signal_group(pgid, signal) {
                Ok(()) => true,
                Err(e) => {
                    debug!(target: "cmdvisor.core.watchdog", slot, pgid, %signal, error = %e, "signal delivery failed");
                    report.failed += 1;
                    false
                }
            };
            self.metrics.record_signal(signal, delivered);
            debug!(target: "cmdvisor.core.watchdog", slot, pgid, %signal, collective, "escalated");
            report.sent.push((pgid, signal));
        }
        report
    }

    /// Start the watchdog on the current tokio runtime.
    ///
    /// When `cancel` fires the runner begins draining. Depending on
    /// [`RunnerConfig::stop_mode`](crate::RunnerConfig::stop_mode) the task then either returns
    /// immediately or keeps ticking until every slot is released.
    pub fn spawn_watchdog(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let runner = Arc::clone(self);
        tokio::spawn(async move { runner.watch(cancel).await })
    }

    async fn watch(&self, cancel: CancellationToken) {
        let mut ticker = interval(self.cfg.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick of a tokio interval completes immediately
        ticker.tick().await;
        debug!(target: "cmdvisor.core.watchdog", period_ms = self.cfg.check_interval.as_millis() as u64, "watchdog started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.begin_drain();
                    break;
                }
                _ = ticker.tick() => {
                    let report = self.tick();
                    if !report.is_empty() {
                        trace!(target: "cmdvisor.core.watchdog", ?report, "tick");
                    }
                }
            }
        }

        if self.cfg.stop_mode == StopMode::Immediate {
            info!(target: "cmdvisor.core.watchdog", running = self.running(), "watchdog stopped");
            return;
        }

        while !self.all_instances_released() {
            ticker.tick().await;
            self.tick();
        }
        info!(target: "cmdvisor.core.watchdog", "all commands released; watchdog stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        config::RunnerConfig,
        metrics::NoopMetrics,
        testing::{CountingMetrics, RecordingSignaller},
    };

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn runner_with(signaller: Arc<RecordingSignaller>) -> Runner {
        let cfg = RunnerConfig::default()
            .with_capacity(3)
            .with_drain_grace(secs(5))
            .with_interrupt_wait(secs(2))
            .with_terminate_wait(secs(5));
        Runner::with_parts(cfg, signaller, Arc::new(NoopMetrics)).unwrap()
    }

    /// Claim a slot and publish a fake process with `timeout`, returning the start time.
    fn start_fake(r: &Runner, pgid: i32, timeout: Duration) -> Instant {
        let index = r.lock().allocate().unwrap();
        let now = Instant::now();
        r.lock().mark_started(index, pgid, now + timeout);
        now
    }

    #[test]
    fn escalates_a_timed_out_instance_in_order() {
        let sig = Arc::new(RecordingSignaller::default());
        let r = runner_with(sig.clone());
        let t0 = start_fake(&r, 500, secs(1));

        assert!(r.tick_at(t0).is_empty());
        assert_eq!(r.tick_at(t0 + secs(1)).sent, vec![(500, Signal::Interrupt)]);
        assert!(r.tick_at(t0 + secs(2)).is_empty());
        assert_eq!(r.tick_at(t0 + secs(4)).sent, vec![(500, Signal::Terminate)]);
        assert!(r.tick_at(t0 + secs(8)).is_empty());
        assert_eq!(r.tick_at(t0 + secs(10)).sent, vec![(500, Signal::Kill)]);

        assert_eq!(
            sig.signals(),
            vec![Signal::Interrupt, Signal::Terminate, Signal::Kill]
        );
    }

    #[test]
    fn killed_instance_is_left_alone_on_later_ticks() {
        let sig = Arc::new(RecordingSignaller::default());
        let r = runner_with(sig.clone());
        let t0 = start_fake(&r, 510, Duration::ZERO);

        for s in 0..20 {
            r.tick_at(t0 + secs(s));
        }
        r.begin_drain();
        for s in 20..30 {
            r.tick_at(t0 + secs(s));
        }

        assert_eq!(
            sig.signals(),
            vec![Signal::Interrupt, Signal::Terminate, Signal::Kill]
        );
    }

    #[test]
    fn unstarted_slots_are_skipped() {
        let sig = Arc::new(RecordingSignaller::default());
        let r = runner_with(sig.clone());
        let _claimed = r.lock().allocate().unwrap();
        r.begin_drain();

        let report = r.tick_at(Instant::now() + secs(3600));
        assert!(report.is_empty());
        assert!(sig.signals().is_empty());
    }

    #[test]
    fn drain_escalates_everything_once_grace_expires() {
        let sig = Arc::new(RecordingSignaller::default());
        let r = runner_with(sig.clone());
        let t0 = start_fake(&r, 601, secs(3600));
        start_fake(&r, 602, secs(3600));

        r.begin_drain();
        let drain_at = r.lock().drain_at().unwrap();

        assert!(r.tick_at(t0 + secs(1)).is_empty());
        let report = r.tick_at(drain_at);
        assert_eq!(
            report.sent,
            vec![(601, Signal::Interrupt), (602, Signal::Interrupt)]
        );
    }

    #[test]
    fn timed_out_instance_is_escalated_during_grace_window() {
        let sig = Arc::new(RecordingSignaller::default());
        let r = runner_with(sig.clone());
        let t0 = start_fake(&r, 700, secs(1));
        start_fake(&r, 701, secs(3600));
        r.begin_drain();

        // still inside the 5s grace window: only the instance past its own deadline moves
        let report = r.tick_at(t0 + secs(2));
        assert_eq!(report.sent, vec![(700, Signal::Interrupt)]);
    }

    #[test]
    fn delivery_failures_are_counted_not_raised() {
        let sig = Arc::new(RecordingSignaller::failing());
        let metrics = Arc::new(CountingMetrics::default());
        let r = runner_with(sig.clone()).with_metrics(metrics.clone());
        let t0 = start_fake(&r, 800, Duration::ZERO);

        let report = r.tick_at(t0 + secs(1));
        assert_eq!(report.failed, 1);
        assert_eq!(report.sent, vec![(800, Signal::Interrupt)]);
        assert_eq!(metrics.signals(), vec![(Signal::Interrupt, false)]);

        // the stage is still recorded, so the next stage follows its own window
        assert_eq!(r.tick_at(t0 + secs(4)).sent, vec![(800, Signal::Terminate)]);
    }

    #[test]
    fn released_instances_are_no_longer_signalled() {
        let sig = Arc::new(RecordingSignaller::default());
        let r = runner_with(sig.clone());
        let lease = r.allocate().unwrap();
        lease.mark_started(900, Duration::ZERO);
        drop(lease);

        assert!(r.tick_at(Instant::now() + secs(60)).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_mode_stops_on_cancel() {
        let cfg = RunnerConfig::default().with_stop_mode(StopMode::Immediate);
        let r = Arc::new(
            Runner::with_parts(
                cfg,
                Arc::new(RecordingSignaller::default()),
                Arc::new(NoopMetrics),
            )
            .unwrap(),
        );
        let _held = r.allocate().unwrap();

        let cancel = CancellationToken::new();
        let handle = r.spawn_watchdog(cancel.clone());
        cancel.cancel();

        tokio::time::timeout(secs(5), handle)
            .await
            .expect("watchdog should stop without waiting for slots")
            .unwrap();
        assert!(r.is_draining());
        assert!(!r.all_instances_released());
    }

    #[tokio::test(start_paused = true)]
    async fn drain_mode_waits_until_every_slot_is_released() {
        let r = Arc::new(
            Runner::with_parts(
                RunnerConfig::default(),
                Arc::new(RecordingSignaller::default()),
                Arc::new(NoopMetrics),
            )
            .unwrap(),
        );
        let index = r.lock().allocate().unwrap();

        let cancel = CancellationToken::new();
        let handle = r.spawn_watchdog(cancel.clone());
        cancel.cancel();

        tokio::time::sleep(secs(3)).await;
        assert!(!handle.is_finished());
        assert!(r.is_draining());

        r.lock().release(index);
        tokio::time::timeout(secs(5), handle)
            .await
            .expect("watchdog should stop once the table is empty")
            .unwrap();
    }
}
