//! Error taxonomy for the valuation pipeline

/// Errors raised while producing a valuation.
///
/// Only [`ValuationError::AdjustmentConfigUnavailable`] is recoverable: the
/// service degrades to skipping percentage adjustments. Every other variant
/// aborts the valuation.
#[derive(thiserror::Error, Debug)]
pub enum ValuationError {
    #[error("Failed to load artifact '{artifact}': {reason}")]
    ConfigLoad { artifact: String, reason: String },

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Adjustment settings unavailable: {0}")]
    AdjustmentConfigUnavailable(String),

    #[error("Numeric instability: {0}")]
    NumericInstability(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ValuationError {
    pub fn config_load(artifact: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::ConfigLoad {
            artifact: artifact.into(),
            reason: reason.to_string(),
        }
    }

    /// Short machine-readable kind, used for metrics labels and API bodies
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigLoad { .. } => "config_load",
            Self::ModelUnavailable(_) => "model_unavailable",
            Self::AdjustmentConfigUnavailable(_) => "adjustment_config_unavailable",
            Self::NumericInstability(_) => "numeric_instability",
            Self::Inference(_) => "inference",
            Self::InvalidInput(_) => "invalid_input",
        }
    }

    /// Whether the pipeline can continue after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::AdjustmentConfigUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, ValuationError>;
