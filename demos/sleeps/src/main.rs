use std::{sync::Arc, time::Duration};

use anyhow::Context;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use cmdvisor_core::{CommandSpec, Runner, RunnerConfig};
use cmdvisor_exec::CombinedOutputFile;
use cmdvisor_observe::{LoggerConfig, logger_init};
use cmdvisor_prometheus::PrometheusMetrics;

const DEFAULT_ENV_PATH: &str = "/usr/local/bin:/usr/bin:/bin:/usr/sbin:/sbin";
const INHERIT_ENV_KEYS: [&str; 3] = ["HOME", "USER", "LOGNAME"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1) Logger
    let cfg = LoggerConfig::default()
        .with_level_from_env("CMDVISOR_LOG")
        .with_watchdog_level("debug")
        .with_run_timing(true);
    logger_init(&cfg)?;

    // 2) Runner + watchdog
    let metrics = PrometheusMetrics::new()?;
    let runner_cfg = RunnerConfig::default()
        .with_capacity(2)
        .with_check_interval(Duration::from_secs(3))
        .with_drain_grace(Duration::from_secs(5))
        .with_interrupt_wait(Duration::from_secs(2))
        .with_terminate_wait(Duration::from_secs(5));
    let runner = Arc::new(Runner::new(runner_cfg)?.with_metrics(Arc::new(metrics.clone())));

    let cancel = CancellationToken::new();
    let watchdog = runner.spawn_watchdog(cancel.clone());
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = wait_for_shutdown_signal().await {
                error!(error = %e, "failed to listen for shutdown signals");
                return;
            }
            info!("shutdown requested");
            cancel.cancel();
        });
    }

    // 3) Commands: (run seconds, timeout seconds)
    let env = command_env();
    let mut jobs = JoinSet::new();
    for (run, timeout) in [(5, 7), (10, 6)] {
        jobs.spawn(sleep_job(Arc::clone(&runner), env.clone(), run, timeout));
    }
    tokio::time::sleep(Duration::from_secs(8)).await;
    for (run, timeout) in [(30, 20), (2, 6)] {
        jobs.spawn(sleep_job(Arc::clone(&runner), env.clone(), run, timeout));
    }

    info!("waiting for commands (press Ctrl+C to test graceful stop)...");
    while let Some(joined) = jobs.join_next().await {
        if let Err(e) = joined {
            error!(error = %e, "command task panicked");
        }
    }

    cancel.cancel();
    watchdog.await.context("watchdog task")?;

    let mut exposition = Vec::new();
    metrics.encode_text(&mut exposition)?;
    info!("final metrics:\n{}", String::from_utf8_lossy(&exposition));
    Ok(())
}

/// Run `sleep <run>` with a `<timeout>` second deadline, logging to `/tmp/cmdvisor-sleep-*`.
async fn sleep_job(runner: Arc<Runner>, env: Vec<String>, run: u64, timeout: u64) {
    let name = format!("cmd-sleep-{run}-tm{timeout}");
    info!(command = %name, "run command");

    let mut log = match CombinedOutputFile::open(format!("/tmp/cmdvisor-sleep-{run}-tm{timeout}"), 0o600) {
        Ok(log) => log,
        Err(e) => {
            error!(command = %name, error = %e, "cannot open terminal log");
            return;
        }
    };

    let spec = CommandSpec::new("sleep", Duration::from_secs(timeout))
        .arg(run.to_string())
        .cwd("/tmp")
        .envs(env);
    let result = runner.run(&spec, &mut [&mut log]).await;
    log.log_result(&result);
    if let Err(e) = log.close() {
        error!(command = %name, error = %e, "cannot close terminal log");
    }

    match result {
        Ok(status) => info!(command = %name, %status, "run completed"),
        Err(e) => error!(command = %name, error = %e, "run failed"),
    }
}

/// A minimal environment: a few identity variables from our own environment plus a fixed PATH.
fn command_env() -> Vec<String> {
    let mut env: Vec<String> = INHERIT_ENV_KEYS
        .iter()
        .filter_map(|key| {
            std::env::var(key)
                .ok()
                .filter(|v| !v.is_empty())
                .map(|v| format!("{key}={v}"))
        })
        .collect();
    env.push(format!("PATH={DEFAULT_ENV_PATH}"));
    env
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
