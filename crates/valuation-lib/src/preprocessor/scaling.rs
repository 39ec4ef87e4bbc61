//! Standard scaling with per-feature override rules

use crate::artifacts::{MedianConfig, ScalerConfig};
use crate::models::{NumericFeature, PropertyDescription, NUM_NUMERIC_FEATURES};

/// Bound applied to every standard z-score
pub const Z_CLAMP: f64 = 3.0;

/// z-score equivalent to two bathrooms under the training scaler
pub const NEUTRAL_BATHROOM_Z: f64 = 1.9;

/// How a single numeric feature is turned into a model input
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalingRule {
    /// `(value - mean) / std_dev`, clamped to `[-bound, bound]`
    Standard { bound: f64 },
    /// Constant z-score regardless of the input
    Fixed(f64),
}

/// Features whose scaling departs from the generic rule.
///
/// - expenses: training data used a monetary unit that current listings no
///   longer share, so the feature is neutralized.
/// - bathrooms: the trained slope is inverted; the input is pinned to two
///   bathrooms and the real effect is applied after inference.
/// - bedrooms: clamped like every other feature, listed to keep it explicit.
pub const FEATURE_OVERRIDES: &[(NumericFeature, ScalingRule)] = &[
    (NumericFeature::Expenses, ScalingRule::Fixed(0.0)),
    (NumericFeature::Bathrooms, ScalingRule::Fixed(NEUTRAL_BATHROOM_Z)),
    (NumericFeature::Bedrooms, ScalingRule::Standard { bound: Z_CLAMP }),
];

impl ScalingRule {
    pub fn for_feature(feature: NumericFeature) -> ScalingRule {
        FEATURE_OVERRIDES
            .iter()
            .find(|(f, _)| *f == feature)
            .map(|(_, rule)| *rule)
            .unwrap_or(ScalingRule::Standard { bound: Z_CLAMP })
    }

    pub fn apply(self, value: f64, mean: f64, std_dev: f64) -> f64 {
        match self {
            ScalingRule::Standard { bound } => ((value - mean) / std_dev).clamp(-bound, bound),
            ScalingRule::Fixed(z) => z,
        }
    }
}

/// Impute unknown values with medians, then scale in training column order
pub fn scale_numeric(
    description: &PropertyDescription,
    scaler: &ScalerConfig,
    medians: &MedianConfig,
) -> [f64; NUM_NUMERIC_FEATURES] {
    let mut scaled = [0.0; NUM_NUMERIC_FEATURES];
    for feature in NumericFeature::ALL {
        let value = description
            .numeric(feature)
            .unwrap_or_else(|| medians.median_of(feature));
        scaled[feature.index()] = ScalingRule::for_feature(feature).apply(
            value,
            scaler.mean_of(feature),
            scaler.std_dev_of(feature),
        );
    }
    scaled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_table() {
        assert_eq!(ScalingRule::for_feature(NumericFeature::Expenses), ScalingRule::Fixed(0.0));
        assert_eq!(
            ScalingRule::for_feature(NumericFeature::Bathrooms),
            ScalingRule::Fixed(NEUTRAL_BATHROOM_Z)
        );
        assert_eq!(
            ScalingRule::for_feature(NumericFeature::Bedrooms),
            ScalingRule::Standard { bound: 3.0 }
        );
        assert_eq!(
            ScalingRule::for_feature(NumericFeature::AreaTotal),
            ScalingRule::Standard { bound: 3.0 }
        );
    }

    #[test]
    fn test_standard_rule_clamps() {
        let rule = ScalingRule::Standard { bound: Z_CLAMP };
        assert_eq!(rule.apply(12.0, 10.0, 2.0), 1.0);
        assert_eq!(rule.apply(1_000.0, 10.0, 2.0), 3.0);
        assert_eq!(rule.apply(-1_000.0, 10.0, 2.0), -3.0);
    }

    #[test]
    fn test_fixed_rule_ignores_input() {
        let rule = ScalingRule::Fixed(1.9);
        assert_eq!(rule.apply(0.0, 1.0, 1.0), 1.9);
        assert_eq!(rule.apply(f64::MAX, 1.0, 1.0), 1.9);
    }
}
