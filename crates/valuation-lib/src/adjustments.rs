//! Sources for the user-configured percentage adjustments
//!
//! Settings are fetched on every valuation. They are best effort: a source
//! that cannot be reached or returns garbage yields
//! [`ValuationError::AdjustmentConfigUnavailable`], which the service turns
//! into "no percentage adjustments".

use crate::error::{Result, ValuationError};
use crate::models::AdjustmentConfig;
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Timeout for a single settings fetch
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Provides the adjustment settings for a valuation
#[async_trait]
pub trait AdjustmentSource: Send + Sync {
    async fn fetch(&self) -> Result<AdjustmentConfig>;
}

/// Source that never configures any adjustment
#[derive(Debug, Clone, Default)]
pub struct NoAdjustments;

#[async_trait]
impl AdjustmentSource for NoAdjustments {
    async fn fetch(&self) -> Result<AdjustmentConfig> {
        Ok(AdjustmentConfig::default())
    }
}

/// Fixed settings held in memory
#[derive(Debug, Clone, Default)]
pub struct StaticAdjustmentSource {
    config: AdjustmentConfig,
}

impl StaticAdjustmentSource {
    pub fn new(config: AdjustmentConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl AdjustmentSource for StaticAdjustmentSource {
    async fn fetch(&self) -> Result<AdjustmentConfig> {
        Ok(self.config.clone())
    }
}

/// Settings served as a JSON object of `{ name: percent }` over HTTP
#[derive(Debug, Clone)]
pub struct HttpAdjustmentSource {
    client: Client,
    url: Url,
}

impl HttpAdjustmentSource {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        use anyhow::Context;

        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;
        let url = Url::parse(url).context("Invalid adjustment settings URL")?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl AdjustmentSource for HttpAdjustmentSource {
    async fn fetch(&self) -> Result<AdjustmentConfig> {
        let unavailable = |reason: String| ValuationError::AdjustmentConfigUnavailable(reason);

        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| unavailable(format!("request to {} failed: {}", self.url, e)))?;

        if !response.status().is_success() {
            return Err(unavailable(format!(
                "{} returned {}",
                self.url,
                response.status()
            )));
        }

        let body: HashMap<String, serde_json::Value> = response
            .json()
            .await
            .map_err(|e| unavailable(format!("invalid settings body: {}", e)))?;

        Ok(parse_percentages(body))
    }
}

/// Keep numeric entries; labels or flags stored next to them are ignored
fn parse_percentages(body: HashMap<String, serde_json::Value>) -> AdjustmentConfig {
    let mut config = AdjustmentConfig::new();
    for (key, value) in body {
        match value.as_f64() {
            Some(percent) => {
                config.0.insert(key, percent);
            }
            None => debug!(key = %key, "Ignoring non-numeric adjustment entry"),
        }
    }
    config
}
