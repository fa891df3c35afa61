//! Fixed-interval re-invocation of the configured jobs.
//!
//! The first cycle starts immediately, then one per `interval_secs`. Each
//! cycle runs on its own task. With `allow_overlap = false` a run lock is
//! taken before spawning; a tick that finds it held is skipped and logged.
//! With `allow_overlap = true` cycles may run concurrently and syncs of the
//! same artifact race, last write wins.
//!
//! A failed cycle is logged and counted; it never stops the loop. On
//! shutdown no new cycle starts and in-flight cycles are awaited.

use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinSet;
use tokio::time::{interval, MissedTickBehavior};

use crate::config::SchedulerConfig;
use crate::jobs::JobRunner;

/// One unit of scheduled work.
#[async_trait]
pub trait Cycle: Send + Sync + 'static {
    async fn run_cycle(&self) -> Result<()>;
}

#[async_trait]
impl Cycle for JobRunner {
    async fn run_cycle(&self) -> Result<()> {
        let cycle = self.run_all().await;
        for report in &cycle.reports {
            tracing::info!(job = %report.name, summary = %report.summary(), "job report");
        }
        if !cycle.is_ok() {
            let names: Vec<_> = cycle.failures.iter().map(|(n, _)| n.as_str()).collect();
            anyhow::bail!("{} job(s) failed: {}", names.len(), names.join(", "));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct SchedulerStats {
    pub started: AtomicU64,
    pub skipped: AtomicU64,
    pub failed: AtomicU64,
}

impl SchedulerStats {
    pub fn started(&self) -> u64 {
        self.started.load(Ordering::Relaxed)
    }
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

/// Flip `shutdown` to true once `signal` resolves.
///
/// If the signal listener fails, the error is logged and the sender is held
/// forever so the scheduler keeps running.
pub async fn shutdown_on<F, E>(signal: F, shutdown: watch::Sender<bool>)
where
    F: Future<Output = std::result::Result<(), E>>,
    E: Display,
{
    match signal.await {
        Ok(()) => {
            tracing::info!("Shutdown signal received");
            let _ = shutdown.send(true);
        }
        Err(e) => {
            tracing::error!(error = %e, "Cannot listen for shutdown signal; stop the process to exit");
            std::future::pending::<()>().await;
        }
    }
}

/// Run `cycle` every `config.interval_secs` until `shutdown` flips to true
/// or its sender is dropped.
pub async fn run_scheduler(
    cycle: Arc<dyn Cycle>,
    config: &SchedulerConfig,
    mut shutdown: watch::Receiver<bool>,
) -> Arc<SchedulerStats> {
    let stats = Arc::new(SchedulerStats::default());
    let run_lock = Arc::new(Mutex::new(()));
    let mut tasks = JoinSet::new();

    let mut ticker = interval(Duration::from_secs(config.interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        interval_secs = config.interval_secs,
        allow_overlap = config.allow_overlap,
        "scheduler started"
    );

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    tracing::info!("scheduler shutting down");
                    break;
                }
            }

            _ = ticker.tick() => {
                let guard = if config.allow_overlap {
                    None
                } else {
                    match run_lock.clone().try_lock_owned() {
                        Ok(guard) => Some(guard),
                        Err(_) => {
                            stats.skipped.fetch_add(1, Ordering::Relaxed);
                            tracing::warn!("previous cycle still running, skipping tick");
                            continue;
                        }
                    }
                };

                let n = stats.started.fetch_add(1, Ordering::Relaxed) + 1;
                let cycle = cycle.clone();
                let stats = stats.clone();
                tasks.spawn(async move {
                    let _guard = guard;
                    tracing::info!(cycle = n, "cycle starting");
                    match cycle.run_cycle().await {
                        Ok(()) => tracing::info!(cycle = n, "cycle complete"),
                        Err(e) => {
                            stats.failed.fetch_add(1, Ordering::Relaxed);
                            tracing::error!(cycle = n, error = %format!("{:#}", e), "cycle failed");
                        }
                    }
                });
            }

            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(e) = joined {
                    stats.failed.fetch_add(1, Ordering::Relaxed);
                    tracing::error!(error = %e, "cycle task panicked");
                }
            }
        }
    }

    if !tasks.is_empty() {
        tracing::info!(in_flight = tasks.len(), "waiting for running cycle");
    }
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            stats.failed.fetch_add(1, Ordering::Relaxed);
            tracing::error!(error = %e, "cycle task panicked");
        }
    }

    tracing::info!(
        started = stats.started(),
        skipped = stats.skipped(),
        failed = stats.failed(),
        "scheduler stopped"
    );
    stats
}
