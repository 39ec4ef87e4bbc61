//! Prediction post-processing
//!
//! Converts the raw log-space model output into a price and applies the
//! corrective adjustments on top of it.

use crate::error::{Result, ValuationError};
use crate::models::{AdjustmentConfig, NumericFeature, PropertyDescription, Valuation};
use std::collections::HashSet;

/// Bathroom count the model input is pinned to
pub const BATHROOM_BASELINE: f64 = 2.0;

/// Field names whose configured percentage applies to every valuation
pub const NUMERIC_ADJUSTMENT_FIELDS: [&str; 8] = [
    "area_total",
    "area_covered",
    "rooms",
    "bedrooms",
    "bathrooms",
    "floor",
    "construction_year",
    "expenses",
];

/// Coefficients of the manual bathroom curve
#[derive(Debug, Clone)]
pub struct AdjustmentRules {
    /// Bathrooms at which no correction is applied
    pub bathroom_baseline: f64,
    /// Fractional uplift per bathroom above the baseline
    pub uplift_per_bathroom: f64,
    /// Fractional discount per bathroom at or below the baseline
    pub discount_per_bathroom: f64,
}

impl Default for AdjustmentRules {
    fn default() -> Self {
        Self {
            bathroom_baseline: BATHROOM_BASELINE,
            uplift_per_bathroom: 0.03,
            discount_per_bathroom: 0.05,
        }
    }
}

/// Turns raw model outputs into final prices
#[derive(Debug, Clone, Default)]
pub struct AdjustmentEngine {
    rules: AdjustmentRules,
}

impl AdjustmentEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: AdjustmentRules) -> Self {
        Self { rules }
    }

    /// Produce the final valuation for a raw model output
    ///
    /// # Arguments
    /// * `raw_log_value` - Model output, `log1p` of the price in thousands
    /// * `description` - The listing as supplied, before imputation
    /// * `adjustments` - Percentage settings, `None` to skip that step
    /// * `model_version` - Version string of the model
    ///
    /// Fails with [`ValuationError::NumericInstability`] when any step
    /// overflows, so a price is either finite or not produced at all.
    pub fn finalize(
        &self,
        raw_log_value: f64,
        description: &PropertyDescription,
        adjustments: Option<&AdjustmentConfig>,
        model_version: &str,
    ) -> Result<Valuation> {
        let price_in_thousands = finite("price in thousands", raw_log_value.exp_m1())?;
        let mut price = floor_at_zero(finite("base price", price_in_thousands * 1000.0)?);

        let bathroom_adjustment = self.bathroom_adjustment(description);
        if let Some(adjustment) = bathroom_adjustment {
            price = floor_at_zero(finite("bathroom-adjusted price", price * (1.0 + adjustment))?);
        }

        let percentage_adjustment =
            adjustments.map(|config| total_percentage(&description.all_features, config));
        if let Some(percent) = percentage_adjustment {
            price = floor_at_zero(finite("percentage-adjusted price", price * (1.0 + percent / 100.0))?);
        }

        Ok(Valuation {
            price,
            raw_log_value,
            price_in_thousands,
            bathroom_adjustment,
            percentage_adjustment,
            model_version: model_version.to_string(),
            generated_at: chrono::Utc::now().timestamp(),
        })
    }

    /// Fraction to apply for the listed bathroom count, `None` when unknown
    pub fn bathroom_adjustment(&self, description: &PropertyDescription) -> Option<f64> {
        let bathrooms = description.numeric(NumericFeature::Bathrooms)?;
        let diff = bathrooms - self.rules.bathroom_baseline;
        if diff > 0.0 {
            Some(diff * self.rules.uplift_per_bathroom)
        } else {
            Some(diff * self.rules.discount_per_bathroom)
        }
    }
}

/// Sum of configured percentages for the listing.
///
/// Amenity entries count only when the token appears in the text; numeric
/// field entries always count.
pub fn total_percentage(all_features: &str, config: &AdjustmentConfig) -> f64 {
    let amenities: f64 = amenity_tokens(all_features)
        .iter()
        .filter(|token| !NUMERIC_ADJUSTMENT_FIELDS.contains(&token.as_str()))
        .map(|token| config.percent(token))
        .sum();
    let fields: f64 = NUMERIC_ADJUSTMENT_FIELDS
        .iter()
        .map(|field| config.percent(field))
        .sum();
    amenities + fields
}

/// Distinct lower-cased amenity tokens, split on commas and whitespace
pub fn amenity_tokens(all_features: &str) -> Vec<String> {
    let lowered = all_features.to_lowercase();
    let mut seen = HashSet::new();
    lowered
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter(|token| seen.insert(*token))
        .map(str::to_string)
        .collect()
}

fn finite(stage: &str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ValuationError::NumericInstability(format!("{} is {}", stage, value)))
    }
}

fn floor_at_zero(price: f64) -> f64 {
    if price > 0.0 {
        price
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(bathrooms: Option<f64>, all_features: &str) -> PropertyDescription {
        PropertyDescription {
            bathrooms,
            all_features: all_features.to_string(),
            property_type: "casa".into(),
            ..Default::default()
        }
    }

    const RAW: f64 = 5.0;

    fn base_price() -> f64 {
        RAW.exp_m1() * 1000.0
    }

    #[test]
    fn test_inverts_log_transform() {
        let engine = AdjustmentEngine::new();
        let valuation = engine.finalize(11.5, &listing(None, ""), None, "v1").unwrap();

        assert_eq!(valuation.price_in_thousands, 11.5f64.exp_m1());
        assert_eq!(valuation.price, 11.5f64.exp_m1() * 1000.0);
        assert_eq!(valuation.bathroom_adjustment, None);
        assert_eq!(valuation.percentage_adjustment, None);
        assert_eq!(valuation.model_version, "v1");
    }

    #[test]
    fn test_price_never_negative() {
        let engine = AdjustmentEngine::new();
        let config = AdjustmentConfig::new().with("area_total", -500.0);
        for raw in [-100.0, -1.0, -1e-9, 0.0, 3.0] {
            for bathrooms in [None, Some(0.0), Some(-40.0), Some(9.0)] {
                let valuation = engine
                    .finalize(raw, &listing(bathrooms, "pileta"), Some(&config), "v1")
                    .unwrap();
                assert!(valuation.price >= 0.0, "raw {} gave {}", raw, valuation.price);
            }
        }
    }

    #[test]
    fn test_overflowing_raw_output_is_unstable() {
        let engine = AdjustmentEngine::new();
        // finite model output whose inverse transform overflows
        let err = engine.finalize(710.0, &listing(None, ""), None, "v1").unwrap_err();
        assert!(matches!(err, ValuationError::NumericInstability(_)));
    }

    #[test]
    fn test_overflowing_bathroom_correction_is_unstable() {
        let engine = AdjustmentEngine::new();
        let err = engine
            .finalize(11.5, &listing(Some(1e308), ""), None, "v1")
            .unwrap_err();
        assert!(matches!(err, ValuationError::NumericInstability(_)));
    }

    #[test]
    fn test_overflowing_percentage_is_unstable() {
        let engine = AdjustmentEngine::new();
        let config = AdjustmentConfig::new().with("rooms", 1e308);
        let err = engine
            .finalize(11.5, &listing(None, ""), Some(&config), "v1")
            .unwrap_err();
        assert!(matches!(err, ValuationError::NumericInstability(_)));
    }

    #[test]
    fn test_bathroom_uplift_above_baseline() {
        let engine = AdjustmentEngine::new();
        let valuation = engine.finalize(RAW, &listing(Some(4.0), ""), None, "v1").unwrap();
        assert!((valuation.bathroom_adjustment.unwrap() - 0.06).abs() < 1e-12);
        assert!((valuation.price - base_price() * 1.06).abs() < 1e-6);
    }

    #[test]
    fn test_bathroom_discount_below_baseline() {
        let engine = AdjustmentEngine::new();
        let valuation = engine.finalize(RAW, &listing(Some(1.0), ""), None, "v1").unwrap();
        assert!((valuation.bathroom_adjustment.unwrap() + 0.05).abs() < 1e-12);
        assert!((valuation.price - base_price() * 0.95).abs() < 1e-6);
    }

    #[test]
    fn test_bathroom_baseline_and_unknown() {
        let engine = AdjustmentEngine::new();
        let at_baseline = engine.finalize(RAW, &listing(Some(2.0), ""), None, "v1").unwrap();
        assert_eq!(at_baseline.price, base_price());

        let unknown = engine.finalize(RAW, &listing(None, ""), None, "v1").unwrap();
        assert_eq!(unknown.bathroom_adjustment, None);
        assert_eq!(unknown.price, base_price());
    }

    #[test]
    fn test_amenities_require_presence_in_text() {
        let config = AdjustmentConfig::new()
            .with("pileta", 10.0)
            .with("cochera", 5.0)
            .with("jardin", 7.0)
            .with("sum", 0.0);
        assert_eq!(total_percentage("Pileta, cochera, sum", &config), 15.0);
        assert_eq!(total_percentage("terraza", &config), 0.0);
    }

    #[test]
    fn test_numeric_fields_always_apply() {
        let config = AdjustmentConfig::new()
            .with("area_total", 2.0)
            .with("expenses", -1.0);
        assert_eq!(total_percentage("", &config), 1.0);
        // mentioning a field name in the text does not count it twice
        assert_eq!(total_percentage("expenses area_total", &config), 1.0);
    }

    #[test]
    fn test_repeated_amenity_counts_once() {
        let config = AdjustmentConfig::new().with("pileta", 10.0);
        assert_eq!(total_percentage("pileta pileta, PILETA", &config), 10.0);
    }

    #[test]
    fn test_percentage_applied_after_bathrooms() {
        let engine = AdjustmentEngine::new();
        let config = AdjustmentConfig::new().with("pileta", 10.0).with("rooms", 5.0);
        let valuation = engine
            .finalize(RAW, &listing(Some(3.0), "pileta"), Some(&config), "v1")
            .unwrap();

        assert_eq!(valuation.percentage_adjustment, Some(15.0));
        let expected = base_price() * 1.03 * 1.15;
        assert!((valuation.price - expected).abs() < 1e-6);
    }

    #[test]
    fn test_amenity_tokens() {
        assert_eq!(
            amenity_tokens(" Pileta,cochera  SUM,,pileta "),
            vec!["pileta", "cochera", "sum"]
        );
        assert!(amenity_tokens("").is_empty());
    }
}
