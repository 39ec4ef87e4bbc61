//! The valuation service
//!
//! Owns the cached artifacts, the lazily loaded model and the adjustment
//! source. Construct it once and share it behind an `Arc`.

use crate::adjustments::AdjustmentSource;
use crate::artifacts::ConfigLoader;
use crate::error::Result;
use crate::health::{components, HealthRegistry};
use crate::models::{AdjustmentConfig, PropertyDescription, Valuation, ValuationOptions};
use crate::observability::{StructuredLogger, ValuationMetrics};
use crate::predictor::{AdjustmentEngine, InferenceRunner};
use crate::preprocessor::FeaturePreprocessor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

pub struct ValuationService {
    configs: ConfigLoader,
    runner: InferenceRunner,
    adjustments: Arc<dyn AdjustmentSource>,
    engine: AdjustmentEngine,
    health: HealthRegistry,
    metrics: ValuationMetrics,
    logger: StructuredLogger,
    artifacts_announced: AtomicBool,
    model_announced: AtomicBool,
}

impl ValuationService {
    pub fn new(
        configs: ConfigLoader,
        runner: InferenceRunner,
        adjustments: Arc<dyn AdjustmentSource>,
    ) -> Self {
        Self {
            configs,
            runner,
            adjustments,
            engine: AdjustmentEngine::new(),
            health: HealthRegistry::new(),
            metrics: ValuationMetrics::new(),
            logger: StructuredLogger::new("valuation-service"),
            artifacts_announced: AtomicBool::new(false),
            model_announced: AtomicBool::new(false),
        }
    }

    pub fn with_engine(mut self, engine: AdjustmentEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Report component health into a shared registry
    pub fn with_health(mut self, health: HealthRegistry) -> Self {
        self.health = health;
        self
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn health(&self) -> &HealthRegistry {
        &self.health
    }

    /// Version of the loaded model, if it has been loaded
    pub fn model_version(&self) -> Option<String> {
        self.runner.model_version()
    }

    /// Load artifacts and model ahead of the first valuation
    pub async fn warm_up(&self) -> Result<()> {
        let result = self.load_all().await;
        if let Err(e) = &result {
            self.health.record_error(e).await;
        }
        result
    }

    async fn load_all(&self) -> Result<()> {
        let preprocessor = self.preprocessor().await?;
        self.ensure_model(preprocessor.vector_len()).await
    }

    /// Preprocessor over the loaded artifacts
    pub async fn preprocessor(&self) -> Result<FeaturePreprocessor> {
        let artifacts = self.configs.load().await?;
        let preprocessor = FeaturePreprocessor::new(artifacts);
        if !self.artifacts_announced.swap(true, Ordering::SeqCst) {
            self.logger.log_artifacts_loaded(
                preprocessor.vector_len(),
                preprocessor.artifacts().vectorizer.vocabulary.len(),
            );
            self.health.set_healthy(components::ARTIFACTS).await;
        }
        Ok(preprocessor)
    }

    /// Model input row for a listing; fails before producing anything if
    /// the artifacts cannot be loaded or a categorical value is blank
    pub async fn build_vector(&self, description: &PropertyDescription) -> Result<Vec<f32>> {
        let preprocessor = self.preprocessor().await?;
        description.validate()?;
        Ok(preprocessor.build_vector(description))
    }

    /// Value a listing
    pub async fn valuate(
        &self,
        description: &PropertyDescription,
        options: ValuationOptions,
    ) -> Result<Valuation> {
        let start = Instant::now();
        let result = self.run_valuation(description, options).await;

        match &result {
            Ok(valuation) => {
                self.metrics.inc_valuations();
                self.metrics
                    .observe_valuation_latency(start.elapsed().as_secs_f64());
                self.logger.log_valuation(
                    &description.property_type,
                    &description.barrio,
                    valuation.raw_log_value,
                    valuation.price,
                    valuation.percentage_adjustment,
                    &valuation.model_version,
                );
            }
            Err(e) => {
                self.metrics.inc_errors(e.kind());
                self.health.record_error(e).await;
            }
        }
        result
    }

    async fn run_valuation(
        &self,
        description: &PropertyDescription,
        options: ValuationOptions,
    ) -> Result<Valuation> {
        let raw = {
            let row = self.build_vector(description).await?;
            self.ensure_model(row.len()).await?;

            let inference_start = Instant::now();
            let raw = self.runner.predict_raw(&row).await?;
            self.metrics
                .observe_inference_latency(inference_start.elapsed().as_secs_f64());
            raw
        };

        let adjustments = if options.skip_adjustments {
            debug!("Percentage adjustments skipped by caller");
            None
        } else {
            self.fetch_adjustments().await
        };

        let model_version = self.runner.model_version().unwrap_or_default();
        self.engine
            .finalize(raw, description, adjustments.as_ref(), &model_version)
    }

    async fn ensure_model(&self, vector_len: usize) -> Result<()> {
        self.runner.ensure_loaded(vector_len).await?;
        if !self.model_announced.swap(true, Ordering::SeqCst) {
            let version = self.runner.model_version().unwrap_or_default();
            self.metrics.inc_model_loads();
            self.metrics.set_model_version(&version);
            self.logger.log_model_loaded(&version, vector_len);
            self.health.set_healthy(components::MODEL).await;
        }
        Ok(())
    }

    /// Settings for this valuation; `None` when empty or unavailable
    async fn fetch_adjustments(&self) -> Option<AdjustmentConfig> {
        match self.adjustments.fetch().await {
            Ok(config) => {
                self.health.set_healthy(components::ADJUSTMENTS).await;
                (!config.is_empty()).then_some(config)
            }
            Err(e) => {
                self.logger.log_adjustments_degraded(&e.to_string());
                self.metrics.inc_adjustment_fallbacks();
                self.health.record_error(&e).await;
                None
            }
        }
    }
}
