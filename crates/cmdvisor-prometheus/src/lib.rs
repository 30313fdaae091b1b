//! Prometheus metrics backend for the cmdvisor runner.
//!
//! [`PrometheusMetrics`] implements [`cmdvisor_core::RunnerMetrics`] and keeps its collectors in
//! a private [`Registry`], so several runners (or tests) never collide on the default registry.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use cmdvisor_core::{Runner, RunnerConfig};
//! use cmdvisor_prometheus::PrometheusMetrics;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let metrics = PrometheusMetrics::new()?;
//! let runner = Runner::new(RunnerConfig::default())?.with_metrics(Arc::new(metrics.clone()));
//!
//! let mut buf = Vec::new();
//! metrics.encode_text(&mut buf)?;
//! # drop(runner);
//! # Ok(())
//! # }
//! ```
//!
//! ## Metrics
//! - `cmdvisor_runs_started_total` - Counter
//! - `cmdvisor_runs_finished_total{outcome}` - Counter
//! - `cmdvisor_runs_rejected_total{reason}` - Counter
//! - `cmdvisor_signals_total{signal, delivered}` - Counter
//!
//! This crate does not serve `/metrics`; expose [`PrometheusMetrics::gather`] from the
//! application's own HTTP stack.

mod backend;
pub use backend::PrometheusMetrics;

pub use prometheus::{Encoder, Registry, TextEncoder};
