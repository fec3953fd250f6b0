//! Latest snapshot and the static catalog.
//!
//! Snapshots are swapped in whole behind an `Arc`, so a reader either sees
//! the previous tick or the new one, never a mix.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;

use super::error::StoreError;
use super::types::{Catalog, Snapshot};

pub struct SnapshotStore {
    catalog: RwLock<Option<Arc<Catalog>>>,
    snapshot: RwLock<Arc<Snapshot>>,
    closed: AtomicBool,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self {
            catalog: RwLock::new(None),
            snapshot: RwLock::new(Arc::new(Snapshot::empty())),
            closed: AtomicBool::new(false),
        }
    }

    /// Install the canonical catalog. Only the first install succeeds.
    pub async fn install_catalog(&self, catalog: Catalog) -> Result<Arc<Catalog>, StoreError> {
        let mut slot = self.catalog.write().await;
        if self.is_closed() {
            return Err(StoreError::Closed);
        }
        if slot.is_some() {
            return Err(StoreError::CatalogInstalled);
        }

        let catalog = Arc::new(catalog);
        *slot = Some(catalog.clone());
        Ok(catalog)
    }

    pub async fn catalog(&self) -> Option<Arc<Catalog>> {
        self.catalog.read().await.clone()
    }

    /// Replace the current snapshot.
    ///
    /// Rejected once the store is closed, and for any tick not newer than
    /// the one already published.
    pub async fn publish(&self, snapshot: Snapshot) -> Result<(), StoreError> {
        let mut current = self.snapshot.write().await;
        if self.is_closed() {
            return Err(StoreError::Closed);
        }
        if snapshot.tick <= current.tick {
            return Err(StoreError::StaleTick {
                tick: snapshot.tick,
                current: current.tick,
            });
        }

        *current = Arc::new(snapshot);
        Ok(())
    }

    pub async fn read(&self) -> Arc<Snapshot> {
        self.snapshot.read().await.clone()
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
