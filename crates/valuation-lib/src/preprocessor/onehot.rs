//! One-hot encoding of the categorical dimensions

use crate::artifacts::OneHotConfig;
use crate::models::{CategoricalDimension, PropertyDescription};

/// Append one block per dimension, in property type → barrio → ciudad →
/// provincia order. Unseen values produce an all-zero block.
pub fn encode_categories(
    description: &PropertyDescription,
    config: &OneHotConfig,
    out: &mut Vec<f64>,
) {
    for dimension in CategoricalDimension::ALL {
        let vocabulary = &config.categories[dimension.index()];
        encode_block(vocabulary, description.categorical(dimension), out);
    }
}

fn encode_block(vocabulary: &[String], value: &str, out: &mut Vec<f64>) {
    let value = value.trim();
    let start = out.len();
    out.resize(start + vocabulary.len(), 0.0);
    if let Some(pos) = vocabulary.iter().position(|cat| cat.trim() == value) {
        out[start + pos] = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_exact_match_sets_single_position() {
        let mut out = Vec::new();
        encode_block(&vocab(&["casa", "departamento", "ph"]), "departamento", &mut out);
        assert_eq!(out, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_match_is_trimmed_and_case_sensitive() {
        let mut out = Vec::new();
        encode_block(&vocab(&["Palermo ", "Belgrano"]), "  Palermo", &mut out);
        assert_eq!(out, vec![1.0, 0.0]);

        let mut out = Vec::new();
        encode_block(&vocab(&["Palermo", "Belgrano"]), "palermo", &mut out);
        assert_eq!(out, vec![0.0, 0.0]);
    }

    #[test]
    fn test_unseen_category_yields_zero_block() {
        let mut out = vec![7.0];
        encode_block(&vocab(&["CABA", "Rosario"]), "Ushuaia", &mut out);
        assert_eq!(out, vec![7.0, 0.0, 0.0]);
    }

    #[test]
    fn test_blocks_follow_dimension_order() {
        let config = OneHotConfig {
            categories: vec![
                vocab(&["casa", "ph"]),
                vocab(&["Palermo"]),
                vocab(&["CABA", "Rosario"]),
                vocab(&["Buenos Aires"]),
            ],
        };
        let description = PropertyDescription {
            property_type: "ph".into(),
            barrio: "Nuñez".into(),
            ciudad: "Rosario".into(),
            provincia: "Buenos Aires".into(),
            ..Default::default()
        };

        let mut out = Vec::new();
        encode_categories(&description, &config, &mut out);
        assert_eq!(out, vec![0.0, 1.0, 0.0, 0.0, 1.0, 1.0]);
    }
}
