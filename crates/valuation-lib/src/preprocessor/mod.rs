//! Feature preprocessing for model inference
//!
//! Reproduces the training-time preprocessing of a listing: median
//! imputation, standard scaling, one-hot encoding of the categorical
//! columns and TF-IDF vectorization of the amenity text, concatenated in
//! that order into a single input row.

mod onehot;
mod scaling;
mod tfidf;

pub use onehot::encode_categories;
pub use scaling::{scale_numeric, ScalingRule, FEATURE_OVERRIDES, NEUTRAL_BATHROOM_Z, Z_CLAMP};
pub use tfidf::{encode_text, tokenize};

use crate::artifacts::PreprocessorArtifacts;
use crate::models::PropertyDescription;
use std::sync::Arc;

/// Builds model input rows from listing descriptions
#[derive(Debug, Clone)]
pub struct FeaturePreprocessor {
    artifacts: Arc<PreprocessorArtifacts>,
}

impl FeaturePreprocessor {
    pub fn new(artifacts: Arc<PreprocessorArtifacts>) -> Self {
        Self { artifacts }
    }

    pub fn artifacts(&self) -> &PreprocessorArtifacts {
        &self.artifacts
    }

    /// Length of every vector returned by [`Self::build_vector`]
    pub fn vector_len(&self) -> usize {
        self.artifacts.vector_len()
    }

    /// Build the `[1, vector_len]` input row for a listing
    pub fn build_vector(&self, description: &PropertyDescription) -> Vec<f32> {
        let artifacts = &self.artifacts;
        let mut row = Vec::with_capacity(self.vector_len());

        row.extend(scale_numeric(description, &artifacts.scaler, &artifacts.medians));
        encode_categories(description, &artifacts.onehot, &mut row);
        encode_text(&description.all_features, &artifacts.vectorizer, &mut row);

        row.into_iter().map(|v| v as f32).collect()
    }
}
