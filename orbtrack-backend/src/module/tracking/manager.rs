//! Tracking manager
//!
//! Owns the tracking state and drives its lifecycle:
//! fetch both sources -> build catalog -> start the propagation scheduler.
//! Shutdown closes the store first, so results that arrive late are
//! discarded rather than installed.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::AbortHandle;

use super::bulk::BulkSource;
use super::catalog::build_catalog;
use super::enrichment::EnrichmentTable;
use super::error::{FetchError, StoreError};
use super::featured::FeaturedSource;
use super::propagation::{Propagator, Sgp4Propagator};
use super::resolver::QueryResolver;
use super::source::ElementSetSource;
use super::store::SnapshotStore;
use super::types::{Catalog, ElementSetRecord};
use crate::config::TrackerConfig;
use crate::module::scheduled::{PropagationScheduler, SchedulerHandle};

pub struct TrackingManager {
    store: Arc<SnapshotStore>,
    resolver: Arc<QueryResolver>,
    featured: Arc<dyn ElementSetSource>,
    bulk: Arc<dyn ElementSetSource>,
    enrichment: Arc<EnrichmentTable>,
    propagator: Arc<dyn Propagator>,
    tick_interval: Duration,
    ingest_timeout: Duration,
    scheduler: Mutex<Option<SchedulerHandle>>,
    shutdown: watch::Sender<bool>,
}

impl TrackingManager {
    pub fn new(
        featured: Arc<dyn ElementSetSource>,
        bulk: Arc<dyn ElementSetSource>,
        enrichment: EnrichmentTable,
        propagator: Arc<dyn Propagator>,
        tick_interval: Duration,
        ingest_timeout: Duration,
    ) -> Self {
        let store = Arc::new(SnapshotStore::new());
        let resolver = Arc::new(QueryResolver::new(store.clone()));
        let (shutdown, _) = watch::channel(false);

        Self {
            store,
            resolver,
            featured,
            bulk,
            enrichment: Arc::new(enrichment),
            propagator,
            tick_interval,
            ingest_timeout,
            scheduler: Mutex::new(None),
            shutdown,
        }
    }

    /// Production wiring: HTTP sources, SGP4, built-in table plus optional CSV
    pub async fn from_config(config: &TrackerConfig) -> anyhow::Result<Self> {
        let featured = FeaturedSource::new(&config.featured)?;
        let bulk = BulkSource::new(&config.bulk)?;

        let enrichment = match &config.enrichment_csv {
            Some(path) => EnrichmentTable::builtin_with_csv(path).await?,
            None => EnrichmentTable::builtin(),
        };
        tracing::info!("Enrichment table has {} entries", enrichment.len());

        Ok(Self::new(
            Arc::new(featured),
            Arc::new(bulk),
            enrichment,
            Arc::new(Sgp4Propagator::new()),
            config.tick_interval(),
            config.ingest_timeout(),
        ))
    }

    pub fn store(&self) -> Arc<SnapshotStore> {
        self.store.clone()
    }

    pub fn resolver(&self) -> Arc<QueryResolver> {
        self.resolver.clone()
    }

    /// Fetch both sources concurrently and install the merged catalog.
    ///
    /// Each source is bounded by the ingest timeout; one that fails or hangs
    /// contributes nothing. Gives up with `StoreError::Closed` if shutdown
    /// happens while waiting.
    pub async fn ingest(&self) -> Result<Arc<Catalog>, StoreError> {
        if self.store.is_closed() {
            return Err(StoreError::Closed);
        }

        tracing::info!("Fetching element sets from featured and bulk sources...");
        let featured = fetch_bounded(self.featured.clone(), self.ingest_timeout);
        let bulk = fetch_bounded(self.bulk.clone(), self.ingest_timeout);

        let (featured, bulk) = tokio::select! {
            results = async { tokio::join!(featured, bulk) } => results,
            _ = closed(self.shutdown.subscribe()) => {
                tracing::info!("Shutdown during ingestion, discarding fetch results");
                return Err(StoreError::Closed);
            }
        };

        let (featured_count, bulk_count) = (featured.len(), bulk.len());
        let catalog = build_catalog(featured, bulk, &self.enrichment);
        tracing::info!(
            "Catalog built: {} records ({} featured, {} bulk fetched)",
            catalog.len(),
            featured_count,
            bulk_count
        );

        self.store.install_catalog(catalog).await
    }

    /// Ingest, then start the propagation scheduler
    pub async fn start(&self) -> Result<(), StoreError> {
        let catalog = self.ingest().await?;
        if catalog.is_empty() {
            tracing::warn!("Catalog is empty, snapshots will have no positions");
        }

        let mut slot = self.scheduler.lock().await;
        if self.store.is_closed() {
            return Err(StoreError::Closed);
        }

        let scheduler = PropagationScheduler::new(
            self.store.clone(),
            catalog,
            self.propagator.clone(),
            self.tick_interval,
        );
        *slot = Some(scheduler.start());
        Ok(())
    }

    /// Close the store, abandon pending ingestion and stop the scheduler
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down tracking manager...");

        self.store.close();
        self.shutdown.send_replace(true);

        if let Some(handle) = self.scheduler.lock().await.take() {
            handle.cancel().await;
        }

        tracing::info!("Tracking manager stopped");
    }
}

/// Resolves once shutdown has been signalled
async fn closed(mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Aborts the source task when the fetch is abandoned
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Run one source on its own task, bounded by `timeout`.
///
/// Dropping the returned future cancels the task.
async fn fetch_bounded(source: Arc<dyn ElementSetSource>, timeout: Duration) -> Vec<ElementSetRecord> {
    let name = source.name().to_string();
    let mut task = tokio::spawn(async move { source.fetch().await });
    let _abort = AbortOnDrop(task.abort_handle());

    match tokio::time::timeout(timeout, &mut task).await {
        Ok(Ok(records)) => records,
        Ok(Err(e)) => {
            tracing::error!("The {} source task failed: {}", name, e);
            Vec::new()
        }
        Err(_) => {
            tracing::error!(
                "The {} source gave no result: {}",
                name,
                FetchError::Timeout(timeout.as_secs())
            );
            Vec::new()
        }
    }
}
