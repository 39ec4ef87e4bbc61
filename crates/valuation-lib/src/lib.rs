//! Property valuation pipeline
//!
//! This crate turns a listing description into a price estimate:
//! - Loading the preprocessing artifacts exported at training time
//! - Building the exact model input row (imputation, scaling, one-hot, TF-IDF)
//! - ONNX inference with a lazily, once-loaded model
//! - Post-processing with the bathroom curve and configured percentage adjustments
//! - Health checks and observability

pub mod adjustments;
pub mod artifacts;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod preprocessor;
pub mod service;

pub use error::{Result, ValuationError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{StructuredLogger, ValuationMetrics};
pub use service::ValuationService;
