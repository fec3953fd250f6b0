//! Search and selection against the latest snapshot.
//!
//! The resolver only stores ids. Every read re-resolves them against
//! whatever snapshot is current, so an object that drops out of a tick
//! reads as "no current position" until it comes back.

use std::sync::Arc;

use tokio::sync::RwLock;

use orbtrack_common::{CatalogId, MarkerView, SatelliteDetail, SnapshotView};

use super::error::QueryError;
use super::store::SnapshotStore;
use super::types::{PositionEntry, Snapshot};

pub const NO_DESCRIPTION: &str = "No additional info available.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    pub selected_id: Option<CatalogId>,
    /// Object found by the last successful search
    pub searched_id: Option<CatalogId>,
}

pub struct QueryResolver {
    store: Arc<SnapshotStore>,
    selection: RwLock<Selection>,
}

impl QueryResolver {
    pub fn new(store: Arc<SnapshotStore>) -> Self {
        Self {
            store,
            selection: RwLock::new(Selection::default()),
        }
    }

    /// Look `id` up in the latest snapshot. When present it becomes both the
    /// selected and the searched object; otherwise nothing changes.
    pub async fn search(&self, id: CatalogId) -> bool {
        let snapshot = self.store.read().await;
        self.search_in(&snapshot, id).await.is_some()
    }

    /// Search from raw user input.
    pub async fn search_query(&self, query: &str) -> Result<SatelliteDetail, QueryError> {
        let id = parse_query(query)?;
        let snapshot = self.store.read().await;
        self.search_in(&snapshot, id)
            .await
            .map(satellite_detail)
            .ok_or(QueryError::NotFound(id))
    }

    async fn search_in<'a>(&self, snapshot: &'a Snapshot, id: CatalogId) -> Option<&'a PositionEntry> {
        let entry = snapshot.get(id)?;
        let mut selection = self.selection.write().await;
        selection.selected_id = Some(id);
        selection.searched_id = Some(id);
        tracing::debug!("Search hit for {}", id);
        Some(entry)
    }

    /// Reset the search highlight and the selection it set
    pub async fn clear(&self) {
        *self.selection.write().await = Selection::default();
    }

    /// Click on a marker. The id must belong to the catalog.
    pub async fn select_by_id(&self, id: CatalogId) -> Result<(), QueryError> {
        let known = match self.store.catalog().await {
            Some(catalog) => catalog.contains(id),
            None => false,
        };
        if !known {
            return Err(QueryError::UnknownId(id));
        }

        self.selection.write().await.selected_id = Some(id);
        Ok(())
    }

    pub async fn deselect(&self) {
        self.selection.write().await.selected_id = None;
    }

    pub async fn selection(&self) -> Selection {
        *self.selection.read().await
    }

    pub async fn current_selection(&self) -> Option<PositionEntry> {
        let id = self.selection.read().await.selected_id?;
        self.store.read().await.get(id).cloned()
    }

    pub async fn current_search_result(&self) -> Option<PositionEntry> {
        let id = self.selection.read().await.searched_id?;
        self.store.read().await.get(id).cloned()
    }

    /// Markers for the map, flagged with the current selection
    pub async fn snapshot_view(&self) -> SnapshotView {
        let selection = self.selection().await;
        let snapshot = self.store.read().await;

        let markers = snapshot
            .entries
            .iter()
            .map(|entry| {
                let id = entry.catalog_id();
                marker_view(
                    entry,
                    selection.selected_id == Some(id),
                    selection.searched_id == Some(id),
                )
            })
            .collect();

        SnapshotView {
            tick: snapshot.tick,
            computed_at: snapshot.computed_at,
            selected_id: selection.selected_id,
            searched_id: selection.searched_id,
            markers,
        }
    }
}

/// Strict catalog number parse: surrounding whitespace only
pub fn parse_query(query: &str) -> Result<CatalogId, QueryError> {
    let trimmed = query.trim();
    trimmed
        .parse::<CatalogId>()
        .map_err(|_| QueryError::InvalidId(trimmed.to_string()))
}

pub fn marker_view(entry: &PositionEntry, selected: bool, highlighted: bool) -> MarkerView {
    let classification = entry.record.classification();
    MarkerView {
        catalog_id: entry.catalog_id(),
        name: entry.record.display_name.clone(),
        latitude: entry.latitude,
        longitude: entry.longitude,
        speed: entry.speed,
        classification,
        icon: classification.icon().to_string(),
        selected,
        highlighted,
    }
}

pub fn satellite_detail(entry: &PositionEntry) -> SatelliteDetail {
    let record = &entry.record;
    let classification = record.classification();
    SatelliteDetail {
        catalog_id: record.catalog_id,
        name: record.display_name.clone(),
        latitude: entry.latitude,
        longitude: entry.longitude,
        speed: entry.speed,
        classification,
        description: record
            .enrichment
            .description
            .clone()
            .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
        image: record
            .enrichment
            .image
            .clone()
            .unwrap_or_else(|| classification.icon().to_string()),
        source: record.source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::tracking::parser::fixtures::*;
    use crate::module::tracking::types::{Catalog, ElementLines, ElementSetRecord};
    use orbtrack_common::{Classification, SourceTag};

    fn records() -> Vec<ElementSetRecord> {
        let mut iss = ElementSetRecord::new(
            25544,
            "ISS",
            ElementLines::new(ISS_LINE1, ISS_LINE2),
            SourceTag::Featured,
        );
        iss.enrichment.classification = Some(Classification::Iss);
        iss.enrichment.description = Some("Crewed station".to_string());
        iss.enrichment.image = Some("/Sat-Images/ISSimage.jpg".to_string());

        let css = ElementSetRecord::new(
            48274,
            "CSS (TIANHE)",
            ElementLines::new(CSS_LINE1, CSS_LINE2),
            SourceTag::Bulk,
        );
        vec![iss, css]
    }

    /// Catalog {25544, 48274}; only 25544 has a position
    async fn setup() -> (Arc<SnapshotStore>, QueryResolver) {
        let store = Arc::new(SnapshotStore::new());
        let catalog = store
            .install_catalog(Catalog::from_records(records()))
            .await
            .unwrap();

        let iss = catalog.get(25544).unwrap().clone();
        store
            .publish(Snapshot {
                tick: 1,
                computed_at: None,
                entries: vec![PositionEntry {
                    record: iss,
                    latitude: 28.6,
                    longitude: 77.2,
                    speed: 7.66,
                }],
            })
            .await
            .unwrap();

        let resolver = QueryResolver::new(store.clone());
        (store, resolver)
    }

    #[tokio::test]
    async fn test_search_hit_sets_selection() {
        let (_store, resolver) = setup().await;

        assert!(resolver.search(25544).await);
        assert_eq!(
            resolver.selection().await,
            Selection {
                selected_id: Some(25544),
                searched_id: Some(25544),
            }
        );
        let found = resolver.current_search_result().await.unwrap();
        assert_eq!(found.latitude, 28.6);
    }

    #[tokio::test]
    async fn test_search_miss_leaves_state() {
        let (_store, resolver) = setup().await;
        assert!(resolver.search(25544).await);

        // In the catalog but without a position this tick
        assert!(!resolver.search(48274).await);
        assert!(!resolver.search(99999).await);
        assert_eq!(resolver.selection().await.searched_id, Some(25544));
    }

    #[tokio::test]
    async fn test_search_query_parsing() {
        let (_store, resolver) = setup().await;

        let detail = resolver.search_query(" 25544 ").await.unwrap();
        assert_eq!(detail.name, "ISS");
        assert_eq!(detail.description, "Crewed station");

        assert_eq!(
            resolver.search_query("ISS").await,
            Err(QueryError::InvalidId("ISS".to_string()))
        );
        assert_eq!(resolver.search_query("").await, Err(QueryError::InvalidId(String::new())));
        assert_eq!(resolver.search_query("48274").await, Err(QueryError::NotFound(48274)));
    }

    #[tokio::test]
    async fn test_clear_resets_both_ids() {
        let (_store, resolver) = setup().await;
        resolver.search(25544).await;
        resolver.clear().await;
        assert_eq!(resolver.selection().await, Selection::default());
    }

    #[tokio::test]
    async fn test_select_requires_catalog_membership() {
        let (_store, resolver) = setup().await;

        resolver.select_by_id(48274).await.unwrap();
        assert_eq!(resolver.selection().await.selected_id, Some(48274));
        assert_eq!(resolver.selection().await.searched_id, None);
        // Selected but not propagated this tick
        assert!(resolver.current_selection().await.is_none());

        assert_eq!(resolver.select_by_id(1).await, Err(QueryError::UnknownId(1)));
        assert_eq!(resolver.selection().await.selected_id, Some(48274));

        resolver.deselect().await;
        assert_eq!(resolver.selection().await.selected_id, None);
    }

    #[tokio::test]
    async fn test_selection_follows_latest_snapshot() {
        let (store, resolver) = setup().await;
        resolver.search(25544).await;

        store
            .publish(Snapshot {
                tick: 2,
                ..Snapshot::empty()
            })
            .await
            .unwrap();

        assert!(resolver.current_selection().await.is_none());
        assert_eq!(resolver.selection().await.selected_id, Some(25544));
    }

    #[tokio::test]
    async fn test_snapshot_view_flags() {
        let (_store, resolver) = setup().await;
        resolver.search(25544).await;

        let view = resolver.snapshot_view().await;
        assert_eq!(view.tick, 1);
        assert_eq!(view.searched_id, Some(25544));
        assert_eq!(view.markers.len(), 1);

        let marker = &view.markers[0];
        assert!(marker.selected);
        assert!(marker.highlighted);
        assert_eq!(marker.icon, "/Icons/Iss-icon.png");
    }

    #[tokio::test]
    async fn test_detail_fallbacks() {
        let record = Arc::new(records().remove(1));
        let detail = satellite_detail(&PositionEntry {
            record,
            latitude: 41.0,
            longitude: -3.5,
            speed: 7.7,
        });

        assert_eq!(detail.description, NO_DESCRIPTION);
        assert_eq!(detail.image, "/Icons/Satellite-icon.png");
        assert_eq!(detail.classification, Classification::Generic);
        assert_eq!(detail.source, SourceTag::Bulk);
    }
}
