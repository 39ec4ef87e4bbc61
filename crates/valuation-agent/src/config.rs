//! Agent configuration

use anyhow::{Context, Result};
use config::builder::{ConfigBuilder, DefaultState};
use serde::Deserialize;
use std::sync::Arc;
use valuation_lib::adjustments::{AdjustmentSource, HttpAdjustmentSource, NoAdjustments};
use valuation_lib::artifacts::{ArtifactSource, FileArtifactSource, HttpArtifactSource};
use valuation_lib::predictor::{ModelSource, OnnxModelLoader, DEFAULT_MAX_MODEL_BYTES};

/// Agent configuration, read from `VALUATION_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Name reported in structured logs
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// API server port for valuations, health and metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Directory or http(s) base URL holding the preprocessing artifacts
    #[serde(default = "default_artifact_location")]
    pub artifact_location: String,

    /// Path or http(s) URL of the ONNX model
    #[serde(default = "default_model_location")]
    pub model_location: String,

    /// Expected SHA-256 of the model file
    #[serde(default)]
    pub model_sha256: Option<String>,

    #[serde(default = "default_max_model_bytes")]
    pub max_model_bytes: usize,

    /// Endpoint serving the percentage adjustment settings
    #[serde(default)]
    pub adjustments_url: Option<String>,

    /// Delay between warm-up attempts while the pipeline cannot load
    #[serde(default = "default_warm_up_retry")]
    pub warm_up_retry_secs: u64,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "valuation-agent".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_artifact_location() -> String {
    "./artifacts".to_string()
}

fn default_model_location() -> String {
    "./artifacts/model.onnx".to_string()
}

fn default_max_model_bytes() -> usize {
    DEFAULT_MAX_MODEL_BYTES
}

fn default_warm_up_retry() -> u64 {
    30
}

fn is_http(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl AgentConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        Self::from_builder(
            config::Config::builder().add_source(config::Environment::with_prefix("VALUATION")),
        )
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        builder
            .build()?
            .try_deserialize()
            .context("Invalid VALUATION_* configuration")
    }

    pub fn artifact_source(&self) -> Result<Arc<dyn ArtifactSource>> {
        if is_http(&self.artifact_location) {
            Ok(Arc::new(HttpArtifactSource::new(&self.artifact_location)?))
        } else {
            Ok(Arc::new(FileArtifactSource::new(&self.artifact_location)))
        }
    }

    pub fn model_loader(&self) -> OnnxModelLoader {
        let loader = OnnxModelLoader::new(ModelSource::parse(&self.model_location))
            .with_max_size(self.max_model_bytes);
        match non_empty(&self.model_sha256) {
            Some(checksum) => loader.with_checksum(checksum),
            None => loader,
        }
    }

    /// Adjustment settings source; without a URL no adjustments are applied
    pub fn adjustment_source(&self) -> Result<Arc<dyn AdjustmentSource>> {
        match non_empty(&self.adjustments_url) {
            Some(url) => Ok(Arc::new(HttpAdjustmentSource::new(url)?)),
            None => Ok(Arc::new(NoAdjustments)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> ConfigBuilder<DefaultState> {
        config::Config::builder()
    }

    #[test]
    fn test_defaults_without_settings() {
        let config = AgentConfig::from_builder(builder()).unwrap();

        assert_eq!(config.api_port, 8080);
        assert_eq!(config.artifact_location, "./artifacts");
        assert_eq!(config.model_location, "./artifacts/model.onnx");
        assert_eq!(config.max_model_bytes, DEFAULT_MAX_MODEL_BYTES);
        assert!(config.model_sha256.is_none());
        assert!(config.adjustments_url.is_none());
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = AgentConfig::from_builder(
            builder()
                .set_override("api_port", 9100)
                .unwrap()
                .set_override("artifact_location", "https://models.internal/tasacion")
                .unwrap()
                .set_override("adjustments_url", "http://settings:8000/api/config/tasacion")
                .unwrap(),
        )
        .unwrap();

        assert_eq!(config.api_port, 9100);
        assert!(is_http(&config.artifact_location));
        assert!(config.artifact_source().is_ok());
        assert!(config.adjustment_source().is_ok());
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let result =
            AgentConfig::from_builder(builder().set_override("api_port", "not-a-port").unwrap());
        assert!(result.is_err());
    }

    #[test]
    fn test_blank_values_count_as_unset() {
        assert_eq!(non_empty(&Some("  ".to_string())), None);
        assert_eq!(non_empty(&Some("abc".to_string())), Some("abc"));
        assert_eq!(non_empty(&None), None);
    }

    #[test]
    fn test_invalid_adjustments_url_is_rejected() {
        let config = AgentConfig::from_builder(
            builder()
                .set_override("adjustments_url", "not a url")
                .unwrap(),
        )
        .unwrap();
        assert!(config.adjustment_source().is_err());
    }
}
