//! TF-IDF vectorization of the amenity text

use crate::artifacts::VectorizerConfig;
use regex::Regex;
use std::sync::OnceLock;

static TOKEN_PATTERN: OnceLock<Regex> = OnceLock::new();

/// Tokens of two or more word characters, as the training vectorizer saw them
fn token_pattern() -> &'static Regex {
    TOKEN_PATTERN.get_or_init(|| Regex::new(r"\b\w\w+\b").expect("token pattern is valid"))
}

/// Lower-cased tokens of the text in order of appearance
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    token_pattern()
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Append the L2-normalized TF-IDF block for `text`
pub fn encode_text(text: &str, config: &VectorizerConfig, out: &mut Vec<f64>) {
    let mut block = vec![0.0; config.idf.len()];

    for token in tokenize(text) {
        if let Some(&idx) = config.vocabulary.get(&token) {
            if idx < block.len() {
                block[idx] += 1.0;
            }
        }
    }

    for (value, idf) in block.iter_mut().zip(&config.idf) {
        *value *= idf;
    }

    let norm = block.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm > 0.0 {
        for value in block.iter_mut() {
            *value /= norm;
        }
    }

    out.extend_from_slice(&block);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config() -> VectorizerConfig {
        let vocabulary: HashMap<String, usize> = [("pileta", 0), ("cochera", 1), ("sum", 2)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        VectorizerConfig {
            vocabulary,
            idf: vec![2.0, 1.0, 3.0],
            max_features: 100,
        }
    }

    #[test]
    fn test_tokenize_lowercases_and_drops_single_chars() {
        assert_eq!(
            tokenize("Pileta, COCHERA y sum"),
            vec!["pileta", "cochera", "sum"]
        );
    }

    #[test]
    fn test_counts_weighted_by_idf_and_normalized() {
        let mut out = Vec::new();
        encode_text("pileta pileta cochera", &config(), &mut out);

        // raw [2, 1, 0] * idf [2, 1, 3] = [4, 1, 0], norm sqrt(17)
        let norm = 17f64.sqrt();
        assert_eq!(out.len(), 3);
        assert!((out[0] - 4.0 / norm).abs() < 1e-12);
        assert!((out[1] - 1.0 / norm).abs() < 1e-12);
        assert_eq!(out[2], 0.0);
    }

    #[test]
    fn test_unit_norm_when_any_token_matches() {
        let mut out = Vec::new();
        encode_text("Seguridad, SUM, balcon", &config(), &mut out);
        let norm: f64 = out.iter().map(|v| v * v).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_all_zero_without_known_tokens() {
        let mut out = Vec::new();
        encode_text("terraza, jardin", &config(), &mut out);
        assert_eq!(out, vec![0.0, 0.0, 0.0]);

        let mut out = Vec::new();
        encode_text("", &config(), &mut out);
        assert_eq!(out, vec![0.0, 0.0, 0.0]);
    }
}
