//! Core data models for the valuation pipeline

use crate::error::{Result, ValuationError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Number of numeric features the model was trained on
pub const NUM_NUMERIC_FEATURES: usize = 8;

/// Number of categorical dimensions encoded as one-hot blocks
pub const NUM_CATEGORICAL_DIMENSIONS: usize = 4;

/// Listing description supplied by the caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyDescription {
    #[serde(default)]
    pub bedrooms: Option<f64>,
    #[serde(default)]
    pub bathrooms: Option<f64>,
    #[serde(default)]
    pub area_total: Option<f64>,
    #[serde(default)]
    pub area_covered: Option<f64>,
    #[serde(default)]
    pub floor: Option<f64>,
    #[serde(default)]
    pub construction_year: Option<f64>,
    #[serde(default)]
    pub rooms: Option<f64>,
    #[serde(default)]
    pub expenses: Option<f64>,
    pub property_type: String,
    pub barrio: String,
    pub ciudad: String,
    pub provincia: String,
    /// Comma/space separated amenity tokens, e.g. "pileta, cochera"
    #[serde(default)]
    pub all_features: String,
}

impl PropertyDescription {
    /// Raw value of a numeric feature, `None` when unknown or non-finite
    pub fn numeric(&self, feature: NumericFeature) -> Option<f64> {
        let value = match feature {
            NumericFeature::Bedrooms => self.bedrooms,
            NumericFeature::Bathrooms => self.bathrooms,
            NumericFeature::AreaTotal => self.area_total,
            NumericFeature::AreaCovered => self.area_covered,
            NumericFeature::Floor => self.floor,
            NumericFeature::ConstructionYear => self.construction_year,
            NumericFeature::Rooms => self.rooms,
            NumericFeature::Expenses => self.expenses,
        };
        value.filter(|v| v.is_finite())
    }

    /// Raw value of a categorical dimension
    pub fn categorical(&self, dimension: CategoricalDimension) -> &str {
        match dimension {
            CategoricalDimension::PropertyType => &self.property_type,
            CategoricalDimension::Barrio => &self.barrio,
            CategoricalDimension::Ciudad => &self.ciudad,
            CategoricalDimension::Provincia => &self.provincia,
        }
    }

    /// Reject listings with a blank categorical value
    pub fn validate(&self) -> Result<()> {
        for dimension in CategoricalDimension::ALL {
            if self.categorical(dimension).trim().is_empty() {
                return Err(ValuationError::InvalidInput(format!(
                    "{} must not be empty",
                    dimension.name()
                )));
            }
        }
        Ok(())
    }
}

/// Numeric features in the column order used at training time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericFeature {
    Bedrooms,
    Bathrooms,
    AreaTotal,
    AreaCovered,
    Floor,
    ConstructionYear,
    Rooms,
    Expenses,
}

impl NumericFeature {
    /// Position in this array is the position in the scaler arrays
    pub const ALL: [NumericFeature; NUM_NUMERIC_FEATURES] = [
        NumericFeature::Bedrooms,
        NumericFeature::Bathrooms,
        NumericFeature::AreaTotal,
        NumericFeature::AreaCovered,
        NumericFeature::Floor,
        NumericFeature::ConstructionYear,
        NumericFeature::Rooms,
        NumericFeature::Expenses,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            NumericFeature::Bedrooms => "bedrooms",
            NumericFeature::Bathrooms => "bathrooms",
            NumericFeature::AreaTotal => "area_total",
            NumericFeature::AreaCovered => "area_covered",
            NumericFeature::Floor => "floor",
            NumericFeature::ConstructionYear => "construction_year",
            NumericFeature::Rooms => "rooms",
            NumericFeature::Expenses => "expenses",
        }
    }
}

/// Categorical dimensions in one-hot block order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoricalDimension {
    PropertyType,
    Barrio,
    Ciudad,
    Provincia,
}

impl CategoricalDimension {
    pub const ALL: [CategoricalDimension; NUM_CATEGORICAL_DIMENSIONS] = [
        CategoricalDimension::PropertyType,
        CategoricalDimension::Barrio,
        CategoricalDimension::Ciudad,
        CategoricalDimension::Provincia,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            CategoricalDimension::PropertyType => "property_type",
            CategoricalDimension::Barrio => "barrio",
            CategoricalDimension::Ciudad => "ciudad",
            CategoricalDimension::Provincia => "provincia",
        }
    }
}

/// Percentage adjustments keyed by amenity token or numeric field name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdjustmentConfig(pub HashMap<String, f64>);

impl AdjustmentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, percent: f64) -> Self {
        self.0.insert(key.into(), percent);
        self
    }

    /// Configured percentage, treating absent and non-finite entries as zero
    pub fn percent(&self, key: &str) -> f64 {
        self.0
            .get(key)
            .copied()
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Per-call valuation options
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ValuationOptions {
    /// Skip fetching and applying configured percentage adjustments
    #[serde(default)]
    pub skip_adjustments: bool,
}

/// Final valuation output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    /// Final price in currency units, never negative
    pub price: f64,
    pub raw_log_value: f64,
    pub price_in_thousands: f64,
    /// Fraction applied by the bathroom correction, `None` when skipped
    pub bathroom_adjustment: Option<f64>,
    /// Total percent applied from the adjustment settings, `None` when skipped
    pub percentage_adjustment: Option<f64>,
    pub model_version: String,
    pub generated_at: i64,
}
