//! Featured source: one element set per hand-picked object, fetched
//! individually from the TLE provider's REST API.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;

use super::error::FetchError;
use super::parser::parse_featured_payload;
use super::source::ElementSetSource;
use super::types::{ElementLines, ElementSetRecord};
use crate::config::{FeaturedConfig, FeaturedSatellite};
use orbtrack_common::{CatalogId, SourceTag};

const USER_AGENT: &str = concat!("orbtrack/", env!("CARGO_PKG_VERSION"));

pub struct FeaturedSource {
    client: Client,
    base_url: String,
    api_key: String,
    satellites: Vec<FeaturedSatellite>,
    max_attempts: u32,
    retry_delay: Duration,
}

impl FeaturedSource {
    pub fn new(config: &FeaturedConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        if config.api_key.is_empty() {
            tracing::warn!("No API key configured for the featured TLE provider");
        }

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            satellites: config.satellites.clone(),
            max_attempts: config.max_attempts.max(1),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        })
    }

    pub fn satellites(&self) -> &[FeaturedSatellite] {
        &self.satellites
    }

    /// Fetch every featured object concurrently; one result per object.
    pub async fn fetch_all(&self) -> Vec<(CatalogId, Result<ElementSetRecord, FetchError>)> {
        let fetches = self
            .satellites
            .iter()
            .map(|sat| async move { (sat.catalog_id, self.fetch_one(sat).await) });
        join_all(fetches).await
    }

    /// Fetch one object, retrying transient failures
    pub async fn fetch_one(&self, sat: &FeaturedSatellite) -> Result<ElementSetRecord, FetchError> {
        let mut attempt = 1;
        loop {
            match self.fetch_attempt(sat.catalog_id).await {
                Ok(lines) => {
                    tracing::debug!("Fetched element set for {} ({})", sat.name, sat.catalog_id);
                    let mut record = ElementSetRecord::new(
                        sat.catalog_id,
                        sat.name.clone(),
                        lines,
                        SourceTag::Featured,
                    );
                    record.enrichment.classification = sat.classification;
                    return Ok(record);
                }
                Err(e) if attempt < self.max_attempts && e.is_retryable() => {
                    tracing::warn!(
                        "Attempt {}/{} failed for {} ({}): {}",
                        attempt,
                        self.max_attempts,
                        sat.name,
                        sat.catalog_id,
                        e
                    );
                    tokio::time::sleep(self.retry_delay * attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Single fetch attempt
    async fn fetch_attempt(&self, catalog_id: CatalogId) -> Result<ElementLines, FetchError> {
        let url = format!("{}/tle/{}", self.base_url, catalog_id);

        let response = self
            .client
            .get(&url)
            .query(&[("apiKey", self.api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        let body = response.text().await?;
        parse_featured_payload(&body, catalog_id)
    }
}

#[async_trait]
impl ElementSetSource for FeaturedSource {
    fn name(&self) -> &str {
        "featured"
    }

    async fn fetch(&self) -> Vec<ElementSetRecord> {
        let results = self.fetch_all().await;
        let requested = results.len();

        let records: Vec<ElementSetRecord> = results
            .into_iter()
            .filter_map(|(catalog_id, result)| match result {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::error!("Failed to fetch element set for {}: {}", catalog_id, e);
                    None
                }
            })
            .collect();

        tracing::info!(
            "Featured source: {} of {} element sets fetched",
            records.len(),
            requested
        );
        records
    }
}
