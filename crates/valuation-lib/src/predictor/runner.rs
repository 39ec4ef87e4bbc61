//! Lazy, single-flight model loading

use super::{ModelLoader, Predictor};
use crate::error::{Result, ValuationError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, error};

/// Runs forward passes against a model loaded on first use.
///
/// The first caller performs the load while concurrent callers await the
/// same initialization, so at most one model instance is ever created. A
/// failed load leaves the runner empty and the next call tries again.
pub struct InferenceRunner {
    loader: Option<Arc<dyn ModelLoader>>,
    model: OnceCell<Arc<dyn Predictor>>,
    inference_count: AtomicU64,
}

impl InferenceRunner {
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader: Some(loader),
            model: OnceCell::new(),
            inference_count: AtomicU64::new(0),
        }
    }

    /// Runner over an already constructed predictor
    pub fn with_predictor(predictor: Arc<dyn Predictor>) -> Self {
        Self {
            loader: None,
            model: OnceCell::new_with(Some(predictor)),
            inference_count: AtomicU64::new(0),
        }
    }

    /// Load the model for rows of `input_len` features if not loaded yet
    pub async fn ensure_loaded(&self, input_len: usize) -> Result<Arc<dyn Predictor>> {
        self.model
            .get_or_try_init(|| async {
                let loader = self.loader.as_ref().ok_or_else(|| {
                    ValuationError::ModelUnavailable("no model loader configured".to_string())
                })?;
                debug!(source = %loader.describe(), "Loading pricing model");
                loader.load(input_len).await.map_err(|e| {
                    let reason = format!("{:#}", e);
                    error!(source = %loader.describe(), error = %reason, "Pricing model failed to load");
                    ValuationError::ModelUnavailable(reason)
                })
            })
            .await
            .cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.model.initialized()
    }

    /// Version of the loaded model, if any
    pub fn model_version(&self) -> Option<String> {
        self.model.get().map(|m| m.model_version().to_string())
    }

    /// Forward pass returning the model's raw log-space output
    pub async fn predict_raw(&self, input: &[f32]) -> Result<f64> {
        let model = self.ensure_loaded(input.len()).await?;
        let raw = model.predict_raw(input)?;
        self.inference_count.fetch_add(1, Ordering::Relaxed);

        if !raw.is_finite() {
            return Err(ValuationError::NumericInstability(format!(
                "model returned {} for a {}-feature row",
                raw,
                input.len()
            )));
        }
        Ok(raw)
    }

    pub fn inference_count(&self) -> u64 {
        self.inference_count.load(Ordering::Relaxed)
    }
}
