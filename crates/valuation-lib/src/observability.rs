//! Observability infrastructure for the valuation pipeline
//!
//! Provides:
//! - Prometheus metrics (valuation latency, inference latency, error counts, model version)
//! - Structured JSON logging with tracing

use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec,
    GaugeVec, Histogram, IntCounter, IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ValuationMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct ValuationMetricsInner {
    valuation_latency_seconds: Histogram,
    inference_latency_seconds: Histogram,
    valuations_total: IntCounter,
    valuation_errors: IntCounterVec,
    adjustment_fallbacks: IntCounter,
    model_loads: IntCounter,
    model_version_info: GaugeVec,
}

impl ValuationMetricsInner {
    fn new() -> Self {
        Self {
            valuation_latency_seconds: register_histogram!(
                "valuation_latency_seconds",
                "End-to-end time to produce a valuation",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register valuation_latency_seconds"),

            inference_latency_seconds: register_histogram!(
                "valuation_inference_latency_seconds",
                "Time spent in the model forward pass",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register inference_latency_seconds"),

            valuations_total: register_int_counter!(
                "valuations_total",
                "Total number of valuations produced"
            )
            .expect("Failed to register valuations_total"),

            valuation_errors: register_int_counter_vec!(
                "valuation_errors_total",
                "Total number of failed valuations by error kind",
                &["kind"]
            )
            .expect("Failed to register valuation_errors"),

            adjustment_fallbacks: register_int_counter!(
                "valuation_adjustment_fallbacks_total",
                "Valuations that skipped percentage adjustments because settings were unavailable"
            )
            .expect("Failed to register adjustment_fallbacks"),

            model_loads: register_int_counter!(
                "valuation_model_loads_total",
                "Number of times the pricing model was loaded"
            )
            .expect("Failed to register model_loads"),

            model_version_info: register_gauge_vec!(
                "valuation_model_version_info",
                "Information about the currently loaded pricing model",
                &["version"]
            )
            .expect("Failed to register model_version_info"),
        }
    }
}

/// Valuation metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct ValuationMetrics {
    _private: (),
}

impl Default for ValuationMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ValuationMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ValuationMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ValuationMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_valuation_latency(&self, duration_secs: f64) {
        self.inner().valuation_latency_seconds.observe(duration_secs);
    }

    pub fn observe_inference_latency(&self, duration_secs: f64) {
        self.inner().inference_latency_seconds.observe(duration_secs);
    }

    pub fn inc_valuations(&self) {
        self.inner().valuations_total.inc();
    }

    pub fn inc_errors(&self, kind: &str) {
        self.inner().valuation_errors.with_label_values(&[kind]).inc();
    }

    pub fn inc_adjustment_fallbacks(&self) {
        self.inner().adjustment_fallbacks.inc();
    }

    pub fn inc_model_loads(&self) {
        self.inner().model_loads.inc();
    }

    /// Update model version info
    pub fn set_model_version(&self, version: &str) {
        self.inner().model_version_info.reset();
        self.inner()
            .model_version_info
            .with_label_values(&[version])
            .set(1.0);
    }

    pub fn valuations_total(&self) -> u64 {
        self.inner().valuations_total.get()
    }
}

/// Structured logger for valuation events
///
/// Provides consistent JSON-formatted logging for valuations and
/// lifecycle events of the host process.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    /// Log a completed valuation
    pub fn log_valuation(
        &self,
        property_type: &str,
        barrio: &str,
        raw_log_value: f64,
        price: f64,
        percentage_adjustment: Option<f64>,
        model_version: &str,
    ) {
        info!(
            event = "valuation_completed",
            instance = %self.instance,
            property_type = %property_type,
            barrio = %barrio,
            raw_log_value = raw_log_value,
            price = price,
            percentage_adjustment = ?percentage_adjustment,
            model_version = %model_version,
            "Valuation completed"
        );
    }

    /// Log that percentage adjustments were skipped
    pub fn log_adjustments_degraded(&self, reason: &str) {
        warn!(
            event = "adjustments_degraded",
            instance = %self.instance,
            reason = %reason,
            "Adjustment settings unavailable, valuing without percentage adjustments"
        );
    }

    /// Log the preprocessing artifacts becoming available
    pub fn log_artifacts_loaded(&self, vector_len: usize, vocabulary_size: usize) {
        info!(
            event = "artifacts_loaded",
            instance = %self.instance,
            vector_len = vector_len,
            vocabulary_size = vocabulary_size,
            "Preprocessing artifacts loaded"
        );
    }

    /// Log the pricing model becoming available
    pub fn log_model_loaded(&self, model_version: &str, vector_len: usize) {
        info!(
            event = "model_loaded",
            instance = %self.instance,
            model_version = %model_version,
            vector_len = vector_len,
            "Pricing model ready"
        );
    }

    /// Log process startup
    pub fn log_startup(&self, version: &str) {
        info!(
            event = "agent_started",
            instance = %self.instance,
            agent_version = %version,
            "Valuation agent started"
        );
    }

    /// Log process shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "agent_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Valuation agent shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valuation_metrics_creation() {
        let metrics = ValuationMetrics::new();

        metrics.observe_valuation_latency(0.001);
        metrics.observe_inference_latency(0.0002);
        metrics.inc_errors("config_load");
        metrics.inc_adjustment_fallbacks();
        metrics.inc_model_loads();
        metrics.set_model_version("sha256-0123456789ab");

        let before = metrics.valuations_total();
        metrics.inc_valuations();
        assert!(metrics.valuations_total() > before);
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("test-instance");
        assert_eq!(logger.instance, "test-instance");
    }
}
