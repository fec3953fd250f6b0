//! Catalog builder
//!
//! Merges the two source outputs into the canonical catalog. Featured
//! records win on id collisions; the local enrichment table fills what the
//! sources left out.

use std::collections::{HashMap, HashSet};

use orbtrack_common::CatalogId;

use super::enrichment::EnrichmentTable;
use super::types::{Catalog, ElementSetRecord};

/// Build the canonical catalog. Pure and deterministic: the same inputs
/// always produce an equal catalog.
pub fn build_catalog(
    featured: Vec<ElementSetRecord>,
    bulk: Vec<ElementSetRecord>,
    table: &EnrichmentTable,
) -> Catalog {
    let featured = dedup_by_id(featured);
    let featured_ids: HashSet<CatalogId> = featured.iter().map(|r| r.catalog_id).collect();

    let (shadowed, bulk): (Vec<_>, Vec<_>) = dedup_by_id(bulk)
        .into_iter()
        .partition(|r| featured_ids.contains(&r.catalog_id));

    let mut shadowed: HashMap<CatalogId, ElementSetRecord> =
        shadowed.into_iter().map(|r| (r.catalog_id, r)).collect();

    let merged: Vec<ElementSetRecord> = featured
        .into_iter()
        .map(|mut record| {
            if let Some(lower) = shadowed.remove(&record.catalog_id) {
                record.backfill_from(&lower);
            }
            record
        })
        .chain(bulk)
        .map(|record| apply_enrichment(record, table))
        .collect();

    Catalog::from_records(merged)
}

/// Keep the first record for each id, preserving order
fn dedup_by_id(records: Vec<ElementSetRecord>) -> Vec<ElementSetRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(r.catalog_id))
        .collect()
}

/// Merge local table detail into a record.
///
/// Name and classification from the table only fill gaps; description and
/// image come from the table whenever the source did not supply them.
pub fn apply_enrichment(mut record: ElementSetRecord, table: &EnrichmentTable) -> ElementSetRecord {
    let Some(entry) = table.get(record.catalog_id) else {
        return record;
    };

    if record.display_name.trim().is_empty() {
        if let Some(name) = &entry.display_name {
            record.display_name = name.clone();
        }
    }

    let enrichment = &mut record.enrichment;
    if enrichment.classification.is_none() {
        enrichment.classification = entry.classification;
    }
    if enrichment.description.is_none() {
        enrichment.description = entry.description.clone();
    }
    if enrichment.image.is_none() {
        enrichment.image = entry.image.clone();
    }

    record
}
