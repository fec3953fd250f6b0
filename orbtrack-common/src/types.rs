use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// NORAD catalog number
pub type CatalogId = u32;

/// Object kind, resolved once when the catalog is built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Classification {
    #[serde(rename = "iss")]
    Iss,
    #[serde(rename = "hubble")]
    Hubble,
    #[default]
    #[serde(rename = "generic")]
    Generic,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Iss => "iss",
            Classification::Hubble => "hubble",
            Classification::Generic => "generic",
        }
    }

    /// Marker icon used by the map surface
    pub fn icon(&self) -> &'static str {
        match self {
            Classification::Iss => "/Icons/Iss-icon.png",
            Classification::Hubble => "/Icons/hubble-icon.png",
            Classification::Generic => "/Icons/Satellite-icon.png",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Classification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "iss" => Ok(Classification::Iss),
            "hubble" => Ok(Classification::Hubble),
            "generic" | "default" => Ok(Classification::Generic),
            _ => Err(format!("Unknown classification: {}", s)),
        }
    }
}

/// Which upstream catalog produced a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceTag {
    #[serde(rename = "featured")]
    Featured,
    #[serde(rename = "bulk")]
    Bulk,
}

impl SourceTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTag::Featured => "featured",
            SourceTag::Bulk => "bulk",
        }
    }
}

impl std::fmt::Display for SourceTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One map marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerView {
    pub catalog_id: CatalogId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// km/s
    pub speed: f64,
    pub classification: Classification,
    pub icon: String,
    pub selected: bool,
    /// Set for the object found by the last search
    pub highlighted: bool,
}

/// Everything the map surface needs to draw one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotView {
    /// 0 until the first tick has been published
    pub tick: u64,
    pub computed_at: Option<DateTime<Utc>>,
    pub selected_id: Option<CatalogId>,
    pub searched_id: Option<CatalogId>,
    pub markers: Vec<MarkerView>,
}

/// Detail panel contents for a selected or searched object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatelliteDetail {
    pub catalog_id: CatalogId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub speed: f64,
    pub classification: Classification,
    pub description: String,
    pub image: String,
    pub source: SourceTag,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntryView {
    pub catalog_id: CatalogId,
    pub name: String,
    pub source: SourceTag,
    pub classification: Classification,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
}

/// Body returned when a request is rejected
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_from_str() {
        assert_eq!("iss".parse::<Classification>(), Ok(Classification::Iss));
        assert_eq!(" Hubble ".parse::<Classification>(), Ok(Classification::Hubble));
        assert_eq!("default".parse::<Classification>(), Ok(Classification::Generic));
        assert!("station".parse::<Classification>().is_err());
    }

    #[test]
    fn test_classification_icon() {
        assert_eq!(Classification::Iss.icon(), "/Icons/Iss-icon.png");
        assert_eq!(Classification::Generic.icon(), "/Icons/Satellite-icon.png");
    }

    #[test]
    fn test_marker_serializes_lowercase_classification() {
        let marker = MarkerView {
            catalog_id: 25544,
            name: "ISS".to_string(),
            latitude: 28.6,
            longitude: 77.2,
            speed: 7.66,
            classification: Classification::Iss,
            icon: Classification::Iss.icon().to_string(),
            selected: false,
            highlighted: true,
        };
        let json = serde_json::to_value(&marker).unwrap();
        assert_eq!(json["classification"], "iss");
        assert_eq!(json["catalog_id"], 25544);
    }
}
