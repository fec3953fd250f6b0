//! Propagation scheduler
//!
//! One background task re-derives the snapshot on a fixed interval:
//! - first tick runs immediately
//! - ticks run inline on a single task, so they never overlap
//! - a slow tick pushes the next one back instead of queueing extra ticks

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::tracking::error::StoreError;
use super::tracking::propagation::{Propagator, compute_snapshot};
use super::tracking::store::SnapshotStore;
use super::tracking::types::{Catalog, TickReport};

pub struct PropagationScheduler {
    store: Arc<SnapshotStore>,
    catalog: Arc<Catalog>,
    propagator: Arc<dyn Propagator>,
    interval: Duration,
}

/// Running scheduler task
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl PropagationScheduler {
    pub fn new(
        store: Arc<SnapshotStore>,
        catalog: Arc<Catalog>,
        propagator: Arc<dyn Propagator>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            catalog,
            propagator,
            interval,
        }
    }

    /// Spawn the tick loop
    pub fn start(self) -> SchedulerHandle {
        let (shutdown, shutdown_rx) = watch::channel(false);

        tracing::info!(
            "Starting propagation scheduler ({} records, every {} ms)",
            self.catalog.len(),
            self.interval.as_millis()
        );

        let handle = tokio::spawn(async move {
            self.run(shutdown_rx).await;
        });

        SchedulerHandle { shutdown, handle }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut tick: u64 = 0;

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = shutdown.changed() => break,
            }
            if *shutdown.borrow() {
                break;
            }

            tick += 1;
            match self.run_tick(tick).await {
                Ok(report) => {
                    tracing::debug!(
                        "Tick {}: {}/{} propagated ({} failed, {} non-finite) in {:.3}s",
                        report.tick,
                        report.propagated,
                        report.catalog_size,
                        report.failed,
                        report.non_finite,
                        report.duration_seconds
                    );
                }
                Err(StoreError::Closed) => break,
                Err(e) => tracing::warn!("Dropped snapshot for tick {}: {}", tick, e),
            }
        }

        tracing::info!("Propagation scheduler stopped after {} ticks", tick);
    }

    /// Propagate the whole catalog to one shared instant and publish
    pub async fn run_tick(&self, tick: u64) -> Result<TickReport, StoreError> {
        let now = Utc::now();
        let (snapshot, report) = compute_snapshot(&self.catalog, self.propagator.as_ref(), now, tick);
        self.store.publish(snapshot).await?;
        Ok(report)
    }
}

impl SchedulerHandle {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the loop. Returns once the task has exited, so no tick
    /// starts after this.
    pub async fn cancel(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            if !e.is_cancelled() {
                tracing::error!("Propagation scheduler task failed: {}", e);
            }
        }
    }
}
