//! Local enrichment table
//!
//! Static per-object display detail (name, kind, description, image),
//! loaded once at startup. Built-in entries cover the well-known objects;
//! an optional CSV file adds or replaces entries by catalog number.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use orbtrack_common::{CatalogId, Classification};
use serde::Deserialize;

/// Detail known locally for one catalog number
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentEntry {
    pub display_name: Option<String>,
    pub classification: Option<Classification>,
    pub description: Option<String>,
    pub image: Option<String>,
}

/// One CSV row: `catalog_id,name,classification,description,image`
#[derive(Debug, Deserialize)]
struct EnrichmentCsvRow {
    catalog_id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    classification: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    image: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl EnrichmentCsvRow {
    fn into_entry(self) -> Result<(CatalogId, EnrichmentEntry)> {
        let catalog_id = self
            .catalog_id
            .trim()
            .parse::<CatalogId>()
            .with_context(|| format!("Invalid catalog id: {:?}", self.catalog_id))?;

        let classification = match non_empty(self.classification) {
            Some(raw) => Some(raw.parse::<Classification>().map_err(anyhow::Error::msg)?),
            None => None,
        };

        Ok((
            catalog_id,
            EnrichmentEntry {
                display_name: non_empty(self.name),
                classification,
                description: non_empty(self.description),
                image: non_empty(self.image),
            },
        ))
    }
}

/// Read-only lookup from catalog number to local detail
#[derive(Debug, Clone, Default)]
pub struct EnrichmentTable {
    entries: HashMap<CatalogId, EnrichmentEntry>,
}

impl EnrichmentTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries shipped with the tracker
    pub fn builtin() -> Self {
        let mut table = Self::new();

        let builtin: [(CatalogId, &str, Option<Classification>, &str, &str); 6] = [
            (
                25544,
                "International Space Station",
                Some(Classification::Iss),
                "Crewed research station in low Earth orbit, operated jointly by NASA, Roscosmos, JAXA, ESA and CSA.",
                "/Sat-Images/ISSimage.jpg",
            ),
            (
                20580,
                "Hubble Space Telescope",
                Some(Classification::Hubble),
                "Optical space telescope launched in 1990, serviced in orbit five times.",
                "/images/hubble-real.jpg",
            ),
            (
                48274,
                "Tiangong Space Station",
                None,
                "China's modular crewed space station, supporting long-duration crews and orbital experiments.",
                "/images/tiangong-real.jpg",
            ),
            (
                41334,
                "GPS BIIF-12 (USA 265)",
                None,
                "Navigation satellite in the Global Positioning System constellation.",
                "/images/gps-satellite.jpg",
            ),
            (
                33591,
                "NOAA 19",
                None,
                "Polar-orbiting weather satellite operated by NOAA.",
                "/images/weather-satellite.jpg",
            ),
            (
                27868,
                "COSMOS 2400",
                None,
                "Russian store-and-forward military communications satellite of the Strela-3 series, launched in 2003.",
                "/Sat-Images/COSMOS 2400.jpg",
            ),
        ];

        for (id, name, classification, description, image) in builtin {
            table.insert(
                id,
                EnrichmentEntry {
                    display_name: Some(name.to_string()),
                    classification,
                    description: Some(description.to_string()),
                    image: Some(image.to_string()),
                },
            );
        }

        table
    }

    /// Built-in entries overlaid with the rows of a CSV file
    pub async fn builtin_with_csv(csv_path: impl AsRef<Path>) -> Result<Self> {
        let mut table = Self::builtin();
        table.load_csv_file(csv_path).await?;
        Ok(table)
    }

    pub async fn load_csv_file(&mut self, csv_path: impl AsRef<Path>) -> Result<usize> {
        let csv_path = csv_path.as_ref();
        tracing::info!("Loading enrichment table from: {}", csv_path.display());

        let content = tokio::fs::read_to_string(csv_path)
            .await
            .with_context(|| format!("Failed to read enrichment CSV: {}", csv_path.display()))?;

        let loaded = self.merge_csv(&content)?;
        tracing::info!("Loaded {} enrichment entries from CSV", loaded);
        Ok(loaded)
    }

    /// Merge CSV content; rows that fail to parse are skipped.
    pub fn merge_csv(&mut self, content: &str) -> Result<usize> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let mut loaded = 0;
        for (row_number, result) in reader.deserialize::<EnrichmentCsvRow>().enumerate() {
            let entry = result
                .map_err(anyhow::Error::from)
                .and_then(EnrichmentCsvRow::into_entry);
            match entry {
                Ok((id, entry)) => {
                    self.insert(id, entry);
                    loaded += 1;
                }
                Err(e) => {
                    tracing::warn!("Skipping enrichment CSV row {}: {}", row_number + 1, e);
                }
            }
        }

        Ok(loaded)
    }

    pub fn insert(&mut self, id: CatalogId, entry: EnrichmentEntry) {
        self.entries.insert(id, entry);
    }

    pub fn get(&self, id: CatalogId) -> Option<&EnrichmentEntry> {
        self.entries.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_builtin_table() {
        let table = EnrichmentTable::builtin();
        assert_eq!(table.len(), 6);

        let iss = table.get(25544).unwrap();
        assert_eq!(iss.classification, Some(Classification::Iss));
        assert!(iss.description.is_some());

        let css = table.get(48274).unwrap();
        assert_eq!(css.classification, None);
        assert!(table.get(99999).is_none());
    }

    #[test]
    fn test_merge_csv_overrides_and_skips_bad_rows() {
        let mut table = EnrichmentTable::builtin();
        let csv = "\
catalog_id,name,classification,description,image
25544,,iss,Updated station text,
43013,NOAA 20,,,/images/noaa20.jpg
abc,Broken,,,
20580,Hubble,telescope,,
";
        let loaded = table.merge_csv(csv).unwrap();
        assert_eq!(loaded, 2);

        let iss = table.get(25544).unwrap();
        assert_eq!(iss.display_name, None);
        assert_eq!(iss.description.as_deref(), Some("Updated station text"));
        assert_eq!(iss.image, None);

        let noaa = table.get(43013).unwrap();
        assert_eq!(noaa.display_name.as_deref(), Some("NOAA 20"));
        assert_eq!(noaa.image.as_deref(), Some("/images/noaa20.jpg"));

        // Unknown classification rejects the row, the built-in entry stays
        assert_eq!(
            table.get(20580).unwrap().classification,
            Some(Classification::Hubble)
        );
    }

    #[tokio::test]
    async fn test_builtin_with_csv_file() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            "catalog_id,name,classification,description,image\n55555,Test Sat,,Demo,\n",
        )
        .unwrap();

        let table = EnrichmentTable::builtin_with_csv(file.path()).await.unwrap();
        assert_eq!(table.len(), 7);
        assert_eq!(
            table.get(55555).unwrap().description.as_deref(),
            Some("Demo")
        );
    }

    #[tokio::test]
    async fn test_missing_csv_is_error() {
        let result = EnrichmentTable::builtin_with_csv("/nonexistent/enrichment.csv").await;
        assert!(result.is_err());
    }
}
