//! Test doubles shared by the unit tests of this crate.

use std::{
    io,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use crate::{
    metrics::{RunFinish, RunnerMetrics},
    signal::{Signal, Signaller},
};

#[derive(Default)]
pub(crate) struct RecordingSignaller {
    fail: bool,
    sent: Mutex<Vec<(i32, Signal)>>,
}

impl RecordingSignaller {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn signals(&self) -> Vec<Signal> {
        self.sent.lock().unwrap().iter().map(|(_, s)| *s).collect()
    }
}

impl Signaller for RecordingSignaller {
    fn signal_group(&self, pgid: i32, signal: Signal) -> io::Result<()> {
        self.sent.lock().unwrap().push((pgid, signal));
        if self.fail {
            return Err(io::Error::from_raw_os_error(3));
        }
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct CountingMetrics {
    pub started: AtomicUsize,
    rejected: Mutex<Vec<&'static str>>,
    finished: Mutex<Vec<RunFinish>>,
    signals: Mutex<Vec<(Signal, bool)>>,
}

impl CountingMetrics {
    pub fn rejected(&self) -> Vec<&'static str> {
        self.rejected.lock().unwrap().clone()
    }

    pub fn finished(&self) -> Vec<RunFinish> {
        self.finished.lock().unwrap().clone()
    }

    pub fn signals(&self) -> Vec<(Signal, bool)> {
        self.signals.lock().unwrap().clone()
    }
}

impl RunnerMetrics for CountingMetrics {
    fn record_started(&self) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn record_rejected(&self, reason: &'static str) {
        self.rejected.lock().unwrap().push(reason);
    }

    fn record_finished(&self, finish: RunFinish) {
        self.finished.lock().unwrap().push(finish);
    }

    fn record_signal(&self, signal: Signal, delivered: bool) {
        self.signals.lock().unwrap().push((signal, delivered));
    }
}
