//! Tracking data model: element-set records, the canonical catalog and
//! per-tick position snapshots.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use orbtrack_common::{CatalogEntryView, CatalogId, Classification, SourceTag};

/// The two fixed-format element lines of a TLE
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementLines {
    pub line1: String,
    pub line2: String,
}

impl ElementLines {
    pub fn new(line1: impl Into<String>, line2: impl Into<String>) -> Self {
        Self {
            line1: line1.into(),
            line2: line2.into(),
        }
    }
}

/// Optional display detail attached to a record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enrichment {
    pub classification: Option<Classification>,
    pub description: Option<String>,
    pub image: Option<String>,
}

impl Enrichment {
    pub fn is_empty(&self) -> bool {
        self.classification.is_none() && self.description.is_none() && self.image.is_none()
    }
}

/// One orbital object before propagation
#[derive(Debug, Clone, PartialEq)]
pub struct ElementSetRecord {
    pub catalog_id: CatalogId,
    pub display_name: String,
    pub lines: ElementLines,
    pub source: SourceTag,
    pub enrichment: Enrichment,
}

impl ElementSetRecord {
    pub fn new(
        catalog_id: CatalogId,
        display_name: impl Into<String>,
        lines: ElementLines,
        source: SourceTag,
    ) -> Self {
        Self {
            catalog_id,
            display_name: display_name.into(),
            lines,
            source,
            enrichment: Enrichment::default(),
        }
    }

    pub fn classification(&self) -> Classification {
        self.enrichment.classification.unwrap_or_default()
    }

    /// Fill fields this record lacks from a lower-precedence record with the
    /// same id. Present fields are never overwritten.
    pub fn backfill_from(&mut self, other: &ElementSetRecord) {
        if self.display_name.trim().is_empty() {
            self.display_name = other.display_name.clone();
        }
        if self.enrichment.classification.is_none() {
            self.enrichment.classification = other.enrichment.classification;
        }
        if self.enrichment.description.is_none() {
            self.enrichment.description = other.enrichment.description.clone();
        }
        if self.enrichment.image.is_none() {
            self.enrichment.image = other.enrichment.image.clone();
        }
    }

    pub fn to_view(&self) -> CatalogEntryView {
        CatalogEntryView {
            catalog_id: self.catalog_id,
            name: self.display_name.clone(),
            source: self.source,
            classification: self.classification(),
        }
    }
}

/// Deduplicated, immutable set of tracked objects
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    records: Vec<Arc<ElementSetRecord>>,
    index: HashMap<CatalogId, usize>,
}

impl Catalog {
    /// Build from records already known to carry distinct ids.
    /// A repeated id keeps its first occurrence.
    pub fn from_records(records: Vec<ElementSetRecord>) -> Self {
        let mut catalog = Self::default();
        for record in records {
            if catalog.index.contains_key(&record.catalog_id) {
                continue;
            }
            catalog.index.insert(record.catalog_id, catalog.records.len());
            catalog.records.push(Arc::new(record));
        }
        catalog
    }

    pub fn get(&self, id: CatalogId) -> Option<&Arc<ElementSetRecord>> {
        self.index.get(&id).map(|&i| &self.records[i])
    }

    pub fn contains(&self, id: CatalogId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ElementSetRecord>> {
        self.records.iter()
    }

    pub fn ids(&self) -> Vec<CatalogId> {
        self.records.iter().map(|r| r.catalog_id).collect()
    }
}

/// Position of one record at a snapshot instant
#[derive(Debug, Clone, PartialEq)]
pub struct PositionEntry {
    pub record: Arc<ElementSetRecord>,
    /// degrees
    pub latitude: f64,
    /// degrees, [-180, 180)
    pub longitude: f64,
    /// km/s
    pub speed: f64,
}

impl PositionEntry {
    pub fn catalog_id(&self) -> CatalogId {
        self.record.catalog_id
    }
}

/// Every successfully propagated position for one tick
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Sequence number; 0 is the empty placeholder before the first tick
    pub tick: u64,
    pub computed_at: Option<DateTime<Utc>>,
    pub entries: Vec<PositionEntry>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self {
            tick: 0,
            computed_at: None,
            entries: Vec::new(),
        }
    }

    pub fn get(&self, id: CatalogId) -> Option<&PositionEntry> {
        self.entries.iter().find(|e| e.catalog_id() == id)
    }

    pub fn contains(&self, id: CatalogId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome counters for one propagation tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub catalog_size: usize,
    pub propagated: usize,
    pub failed: usize,
    pub non_finite: usize,
    pub duration_seconds: f64,
}
