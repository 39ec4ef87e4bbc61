//! Preprocessing artifacts exported at training time
//!
//! Three JSON documents describe the exact preprocessing the model was
//! trained with: the scaler and one-hot categories, the TF-IDF vectorizer,
//! and the median values used for imputation.

mod loader;
mod source;

pub use loader::ConfigLoader;
pub use source::{ArtifactSource, FileArtifactSource, HttpArtifactSource};

use crate::error::{Result, ValuationError};
use crate::models::{NumericFeature, NUM_CATEGORICAL_DIMENSIONS, NUM_NUMERIC_FEATURES};
use serde::Deserialize;
use std::collections::HashMap;

pub const PREPROCESSOR_CONFIG: &str = "preprocessor_config.json";
pub const VECTORIZER_CONFIG: &str = "vectorizer_config.json";
pub const MEDIANS_CONFIG: &str = "medianas.json";

/// Standard scaler parameters aligned with [`NumericFeature::ALL`]
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScalerConfig {
    pub mean: Vec<f64>,
    /// Holds the variance of each feature, not its standard deviation
    pub scale: Vec<f64>,
}

impl ScalerConfig {
    pub fn mean_of(&self, feature: NumericFeature) -> f64 {
        self.mean[feature.index()]
    }

    pub fn std_dev_of(&self, feature: NumericFeature) -> f64 {
        self.scale[feature.index()].sqrt()
    }

    fn validate(&self) -> Result<()> {
        if self.mean.len() != NUM_NUMERIC_FEATURES || self.scale.len() != NUM_NUMERIC_FEATURES {
            return Err(ValuationError::config_load(
                PREPROCESSOR_CONFIG,
                format!(
                    "scaler expects {} means and variances, got {} and {}",
                    NUM_NUMERIC_FEATURES,
                    self.mean.len(),
                    self.scale.len()
                ),
            ));
        }
        if let Some(i) = self.mean.iter().position(|m| !m.is_finite()) {
            return Err(ValuationError::config_load(
                PREPROCESSOR_CONFIG,
                format!("scaler mean at index {} is not finite", i),
            ));
        }
        if let Some(i) = self.scale.iter().position(|v| !(v.is_finite() && *v > 0.0)) {
            return Err(ValuationError::config_load(
                PREPROCESSOR_CONFIG,
                format!("scaler variance at index {} must be positive", i),
            ));
        }
        Ok(())
    }
}

/// Category vocabularies for property type, barrio, ciudad and provincia
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OneHotConfig {
    pub categories: Vec<Vec<String>>,
}

impl OneHotConfig {
    pub fn encoded_len(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    fn validate(&self) -> Result<()> {
        if self.categories.len() != NUM_CATEGORICAL_DIMENSIONS {
            return Err(ValuationError::config_load(
                PREPROCESSOR_CONFIG,
                format!(
                    "onehot expects {} category lists, got {}",
                    NUM_CATEGORICAL_DIMENSIONS,
                    self.categories.len()
                ),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct PreprocessorConfig {
    scaler: ScalerConfig,
    onehot: OneHotConfig,
}

/// TF-IDF vocabulary and inverse document frequencies
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VectorizerConfig {
    pub vocabulary: HashMap<String, usize>,
    pub idf: Vec<f64>,
    pub max_features: usize,
}

impl VectorizerConfig {
    pub fn encoded_len(&self) -> usize {
        self.idf.len()
    }

    fn validate(&self) -> Result<()> {
        if let Some((token, idx)) = self.vocabulary.iter().find(|(_, idx)| **idx >= self.idf.len()) {
            return Err(ValuationError::config_load(
                VECTORIZER_CONFIG,
                format!(
                    "token '{}' maps to index {} beyond idf length {}",
                    token,
                    idx,
                    self.idf.len()
                ),
            ));
        }
        if self.idf.iter().any(|v| !v.is_finite()) {
            return Err(ValuationError::config_load(
                VECTORIZER_CONFIG,
                "idf contains non-finite values",
            ));
        }
        if self.max_features > 0 && self.idf.len() > self.max_features {
            return Err(ValuationError::config_load(
                VECTORIZER_CONFIG,
                format!(
                    "idf length {} exceeds max_features {}",
                    self.idf.len(),
                    self.max_features
                ),
            ));
        }
        Ok(())
    }
}

/// Median fallbacks for unknown numeric features
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MedianConfig {
    pub median_floor: f64,
    pub median_construction_year: f64,
    pub median_expenses: f64,
    pub median_rooms: f64,
    pub median_bedrooms: f64,
    pub median_bathrooms: f64,
    pub median_area_total: f64,
    pub median_area_covered: f64,
}

impl MedianConfig {
    pub fn median_of(&self, feature: NumericFeature) -> f64 {
        match feature {
            NumericFeature::Bedrooms => self.median_bedrooms,
            NumericFeature::Bathrooms => self.median_bathrooms,
            NumericFeature::AreaTotal => self.median_area_total,
            NumericFeature::AreaCovered => self.median_area_covered,
            NumericFeature::Floor => self.median_floor,
            NumericFeature::ConstructionYear => self.median_construction_year,
            NumericFeature::Rooms => self.median_rooms,
            NumericFeature::Expenses => self.median_expenses,
        }
    }

    fn validate(&self) -> Result<()> {
        for feature in NumericFeature::ALL {
            if !self.median_of(feature).is_finite() {
                return Err(ValuationError::config_load(
                    MEDIANS_CONFIG,
                    format!("median for '{}' is not finite", feature.name()),
                ));
            }
        }
        Ok(())
    }
}

/// Validated bundle of every static preprocessing artifact
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessorArtifacts {
    pub scaler: ScalerConfig,
    pub onehot: OneHotConfig,
    pub vectorizer: VectorizerConfig,
    pub medians: MedianConfig,
}

impl PreprocessorArtifacts {
    pub fn new(
        scaler: ScalerConfig,
        onehot: OneHotConfig,
        vectorizer: VectorizerConfig,
        medians: MedianConfig,
    ) -> Result<Self> {
        scaler.validate()?;
        onehot.validate()?;
        vectorizer.validate()?;
        medians.validate()?;
        Ok(Self {
            scaler,
            onehot,
            vectorizer,
            medians,
        })
    }

    /// Parse and validate the three raw JSON documents
    pub fn from_json(preprocessor: &[u8], vectorizer: &[u8], medians: &[u8]) -> Result<Self> {
        let preprocessor: PreprocessorConfig = serde_json::from_slice(preprocessor)
            .map_err(|e| ValuationError::config_load(PREPROCESSOR_CONFIG, e))?;
        let vectorizer: VectorizerConfig = serde_json::from_slice(vectorizer)
            .map_err(|e| ValuationError::config_load(VECTORIZER_CONFIG, e))?;
        let medians: MedianConfig = serde_json::from_slice(medians)
            .map_err(|e| ValuationError::config_load(MEDIANS_CONFIG, e))?;
        Self::new(preprocessor.scaler, preprocessor.onehot, vectorizer, medians)
    }

    /// Length of the model input row
    pub fn vector_len(&self) -> usize {
        NUM_NUMERIC_FEATURES + self.onehot.encoded_len() + self.vectorizer.encoded_len()
    }
}
