//! Bulk source: one large multi-record text feed of active objects.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::error::FetchError;
use super::parser::parse_bulk_feed;
use super::source::ElementSetSource;
use super::types::ElementSetRecord;
use crate::config::BulkConfig;

pub struct BulkSource {
    client: Client,
    url: String,
    max_records: usize,
}

impl BulkSource {
    pub fn new(config: &BulkConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("orbtrack/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            url: config.url.clone(),
            max_records: config.max_records,
        })
    }

    async fn fetch_text(&self) -> Result<String, FetchError> {
        tracing::debug!("Fetching bulk element feed from {}", self.url);

        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl ElementSetSource for BulkSource {
    fn name(&self) -> &str {
        "bulk"
    }

    async fn fetch(&self) -> Vec<ElementSetRecord> {
        let text = match self.fetch_text().await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("Failed to fetch bulk element feed: {}", e);
                return Vec::new();
            }
        };

        let parsed = parse_bulk_feed(&text, self.max_records);
        if parsed.rejected > 0 {
            tracing::warn!("Bulk feed: skipped {} invalid records", parsed.rejected);
        }
        tracing::info!(
            "Bulk source: accepted {} records (cap {})",
            parsed.records.len(),
            self.max_records
        );

        parsed.records
    }
}
