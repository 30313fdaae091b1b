use cmdvisor_core::{RunFinish, RunnerMetrics, Signal};
use prometheus::{
    Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder, proto::MetricFamily,
};

/// Prometheus-backed [`RunnerMetrics`].
///
/// Cloning is cheap and every clone feeds the same collectors.
#[derive(Clone)]
pub struct PrometheusMetrics {
    registry: Registry,
    started: IntCounter,
    finished: IntCounterVec,
    rejected: IntCounterVec,
    signals: IntCounterVec,
}

impl PrometheusMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::with_registry(Registry::new())
    }

    /// Register the collectors on an existing registry.
    pub fn with_registry(registry: Registry) -> Result<Self, prometheus::Error> {
        let started = IntCounter::with_opts(Opts::new(
            "cmdvisor_runs_started_total",
            "Processes started by the runner",
        ))?;
        let finished = IntCounterVec::new(
            Opts::new(
                "cmdvisor_runs_finished_total",
                "Runs that held a slot and finished, by outcome",
            ),
            &["outcome"],
        )?;
        let rejected = IntCounterVec::new(
            Opts::new(
                "cmdvisor_runs_rejected_total",
                "Runs rejected before a slot was claimed, by reason",
            ),
            &["reason"],
        )?;
        let signals = IntCounterVec::new(
            Opts::new(
                "cmdvisor_signals_total",
                "Escalation signals sent by the watchdog",
            ),
            &["signal", "delivered"],
        )?;

        registry.register(Box::new(started.clone()))?;
        registry.register(Box::new(finished.clone()))?;
        registry.register(Box::new(rejected.clone()))?;
        registry.register(Box::new(signals.clone()))?;

        Ok(Self {
            registry,
            started,
            finished,
            rejected,
            signals,
        })
    }

    #[inline]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Encode all metrics in the Prometheus text exposition format.
    pub fn encode_text(&self, buf: &mut Vec<u8>) -> Result<(), prometheus::Error> {
        TextEncoder::new().encode(&self.gather(), buf)
    }
}

impl RunnerMetrics for PrometheusMetrics {
    fn record_started(&self) {
        self.started.inc();
    }

    fn record_rejected(&self, reason: &'static str) {
        self.rejected.with_label_values(&[reason]).inc();
    }

    fn record_finished(&self, finish: RunFinish) {
        self.finished.with_label_values(&[finish.as_label()]).inc();
    }

    fn record_signal(&self, signal: Signal, delivered: bool) {
        let delivered = if delivered { "true" } else { "false" };
        self.signals
            .with_label_values(&[signal.as_str(), delivered])
            .inc();
    }
}
