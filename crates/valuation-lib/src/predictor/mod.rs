//! ML prediction engine

mod adjustment;
mod inference;
mod runner;

pub use adjustment::{
    amenity_tokens, total_percentage, AdjustmentEngine, AdjustmentRules, BATHROOM_BASELINE,
    NUMERIC_ADJUSTMENT_FIELDS,
};
pub use inference::{ModelSource, OnnxModelLoader, OnnxPredictor, DEFAULT_MAX_MODEL_BYTES};
pub use runner::InferenceRunner;

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for prediction implementations
pub trait Predictor: Send + Sync {
    /// Raw model output for one input row, in log space
    fn predict_raw(&self, input: &[f32]) -> Result<f64>;

    /// Get current model version
    fn model_version(&self) -> &str;
}

/// Produces a predictor for rows of a given width
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self, input_len: usize) -> anyhow::Result<Arc<dyn Predictor>>;

    /// Human-readable model location, used in logs
    fn describe(&self) -> String;
}
