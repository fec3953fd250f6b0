use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::Context;
use orbtrack_common::{CatalogId, Classification};
use serde::{Deserialize, Serialize};

/// Environment variable that overrides `featured.api_key`
pub const API_KEY_ENV: &str = "ORBTRACK_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    /// Upper bound on waiting for a single source adapter at startup
    #[serde(default = "default_ingest_timeout_secs")]
    pub ingest_timeout_secs: u64,

    /// Optional CSV extending the built-in enrichment table
    #[serde(default)]
    pub enrichment_csv: Option<PathBuf>,

    #[serde(default)]
    pub featured: FeaturedConfig,

    #[serde(default)]
    pub bulk: BulkConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturedConfig {
    #[serde(default = "default_featured_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_featured_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    #[serde(default = "default_featured_satellites")]
    pub satellites: Vec<FeaturedSatellite>,
}

/// One hand-picked object fetched individually from the TLE provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturedSatellite {
    pub catalog_id: CatalogId,
    pub name: String,
    #[serde(default)]
    pub classification: Option<Classification>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkConfig {
    #[serde(default = "default_bulk_url")]
    pub url: String,

    #[serde(default = "default_max_records")]
    pub max_records: usize,

    #[serde(default = "default_bulk_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8089
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_ingest_timeout_secs() -> u64 {
    60
}

fn default_featured_base_url() -> String {
    "https://api.n2yo.com/rest/v1/satellite".to_string()
}

fn default_featured_timeout_secs() -> u64 {
    15
}

fn default_max_attempts() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_featured_satellites() -> Vec<FeaturedSatellite> {
    vec![
        FeaturedSatellite {
            catalog_id: 25544,
            name: "International Space Station".to_string(),
            classification: Some(Classification::Iss),
        },
        FeaturedSatellite {
            catalog_id: 20580,
            name: "Hubble Space Telescope".to_string(),
            classification: Some(Classification::Hubble),
        },
        FeaturedSatellite {
            catalog_id: 48274,
            name: "Tiangong Space Station".to_string(),
            classification: None,
        },
        FeaturedSatellite {
            catalog_id: 41334,
            name: "GPS BIIF-12 (USA 265)".to_string(),
            classification: None,
        },
    ]
}

fn default_bulk_url() -> String {
    "https://celestrak.org/NORAD/elements/gp.php?GROUP=active&FORMAT=tle".to_string()
}

fn default_max_records() -> usize {
    200
}

fn default_bulk_timeout_secs() -> u64 {
    30
}

fn default_interval_ms() -> u64 {
    2000
}

impl Default for FeaturedConfig {
    fn default() -> Self {
        Self {
            base_url: default_featured_base_url(),
            api_key: String::new(),
            timeout_secs: default_featured_timeout_secs(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            satellites: default_featured_satellites(),
        }
    }
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            url: default_bulk_url(),
            max_records: default_max_records(),
            timeout_secs: default_bulk_timeout_secs(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_dir: default_log_dir(),
            ingest_timeout_secs: default_ingest_timeout_secs(),
            enrichment_csv: None,
            featured: FeaturedConfig::default(),
            bulk: BulkConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl TrackerConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: TrackerConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.scheduler.interval_ms.max(1))
    }

    pub fn ingest_timeout(&self) -> Duration {
        Duration::from_secs(self.ingest_timeout_secs)
    }

    /// Take the API key from the environment when it is set
    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.featured.api_key = key.trim().to_string();
            }
        }
    }
}

pub static CONFIG: OnceLock<TrackerConfig> = OnceLock::new();

/// Load configuration from `path`, falling back to defaults when the file
/// does not exist. Runs before logging is up, so the fallback goes to stderr.
pub fn load_config(path: impl AsRef<Path>) -> anyhow::Result<TrackerConfig> {
    let path = path.as_ref();
    let mut config = if path.exists() {
        TrackerConfig::from_file(path)?
    } else {
        eprintln!("Config file {} not found, using defaults", path.display());
        TrackerConfig::default()
    };
    config.apply_env_overrides();
    Ok(config)
}

/// Load the process-wide configuration once.
///
/// A missing file is not an error: defaults are used instead.
pub fn read_config(path: impl AsRef<Path>) -> anyhow::Result<&'static TrackerConfig> {
    let config = load_config(path)?;
    Ok(CONFIG.get_or_init(|| config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = TrackerConfig::default();
        assert_eq!(config.server_address(), "0.0.0.0:8089");
        assert_eq!(config.bulk.max_records, 200);
        assert_eq!(config.tick_interval(), Duration::from_secs(2));
        assert_eq!(config.featured.satellites.len(), 4);
        assert_eq!(
            config.featured.satellites[0].classification,
            Some(Classification::Iss)
        );
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
port = 9000
log_level = "debug"

[featured]
api_key = "KEY"

[[featured.satellites]]
catalog_id = 25544
name = "ISS"
classification = "iss"

[scheduler]
interval_ms = 500
"#
        )
        .unwrap();

        let config = TrackerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.featured.api_key, "KEY");
        assert_eq!(config.featured.satellites.len(), 1);
        assert_eq!(config.featured.max_attempts, 2);
        assert_eq!(config.bulk.max_records, 200);
        assert_eq!(config.tick_interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.port, 8089);
        assert_eq!(config.bulk.max_records, 200);
    }

    #[test]
    fn test_invalid_file_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "port = \"not a number\"").unwrap();
        assert!(TrackerConfig::from_file(file.path()).is_err());
    }
}
