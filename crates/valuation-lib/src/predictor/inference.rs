//! ONNX inference using tract
//!
//! The pricing model is a small dense regression network exported to ONNX.
//! It takes a single `[1, L]` row and returns the log of the price in
//! thousands.

use super::{ModelLoader, Predictor};
use crate::error::{Result as ValuationResult, ValuationError};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tract_onnx::prelude::*;
use tracing::{debug, info, warn};
use url::Url;

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 5;

/// Default upper bound on model size (64MB)
pub const DEFAULT_MAX_MODEL_BYTES: usize = 64 * 1024 * 1024;

/// Timeout for downloading the model
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX-based predictor using tract for lightweight inference
pub struct OnnxPredictor {
    model: TractModel,
    input_len: usize,
    model_version: String,
}

impl OnnxPredictor {
    /// Parse and optimize an ONNX model for rows of `input_len` features
    pub fn from_bytes(model_bytes: &[u8], input_len: usize, model_version: impl Into<String>) -> Result<Self> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, input_len]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;

        Ok(Self {
            model,
            input_len,
            model_version: model_version.into(),
        })
    }

    fn run(&self, input: &[f32]) -> Result<f32> {
        let tensor: Tensor =
            tract_ndarray::Array2::from_shape_vec((1, self.input_len), input.to_vec())?.into();
        let outputs = self.model.run(tvec!(tensor.into()))?;
        let output = outputs.first().context("No output from model")?;
        let view = output.to_array_view::<f32>()?;
        view.iter().next().copied().context("Model output is empty")
    }
}

impl Predictor for OnnxPredictor {
    fn predict_raw(&self, input: &[f32]) -> ValuationResult<f64> {
        if input.len() != self.input_len {
            return Err(ValuationError::InvalidInput(format!(
                "model expects {} features, got {}",
                self.input_len,
                input.len()
            )));
        }

        let start = Instant::now();
        // Input and output tensors are owned by this call and dropped on return
        let value = self
            .run(input)
            .map_err(|e| ValuationError::Inference(format!("{:#}", e)))?;

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        Ok(value as f64)
    }

    fn model_version(&self) -> &str {
        &self.model_version
    }
}

/// Where the model file lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    Path(PathBuf),
    Url(Url),
}

impl ModelSource {
    /// Interpret `location` as a URL when it has an http(s) scheme, else as a path
    pub fn parse(location: &str) -> Self {
        match Url::parse(location) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => ModelSource::Url(url),
            _ => ModelSource::Path(PathBuf::from(location)),
        }
    }

    fn describe(&self) -> String {
        match self {
            ModelSource::Path(path) => path.display().to_string(),
            ModelSource::Url(url) => url.to_string(),
        }
    }
}

/// Loads an ONNX model from disk or HTTP, validating size and checksum
pub struct OnnxModelLoader {
    source: ModelSource,
    expected_sha256: Option<String>,
    max_model_bytes: usize,
}

impl OnnxModelLoader {
    pub fn new(source: ModelSource) -> Self {
        Self {
            source,
            expected_sha256: None,
            max_model_bytes: DEFAULT_MAX_MODEL_BYTES,
        }
    }

    /// Reject model files whose SHA-256 does not match
    pub fn with_checksum(mut self, sha256_hex: impl Into<String>) -> Self {
        self.expected_sha256 = Some(sha256_hex.into().to_lowercase());
        self
    }

    pub fn with_max_size(mut self, max_model_bytes: usize) -> Self {
        self.max_model_bytes = max_model_bytes;
        self
    }

    async fn read_bytes(&self) -> Result<Vec<u8>> {
        match &self.source {
            ModelSource::Path(path) => tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read model file {:?}", path)),
            ModelSource::Url(url) => {
                let client = Client::builder()
                    .timeout(DOWNLOAD_TIMEOUT)
                    .build()
                    .context("Failed to create HTTP client")?;
                let response = client
                    .get(url.clone())
                    .send()
                    .await
                    .with_context(|| format!("Failed to download model from {}", url))?;
                if !response.status().is_success() {
                    anyhow::bail!("Model download from {} returned {}", url, response.status());
                }
                Ok(response.bytes().await.context("Failed to read model body")?.to_vec())
            }
        }
    }

    /// Validate raw model bytes before handing them to tract
    fn verify(&self, bytes: &[u8]) -> Result<String> {
        if bytes.len() > self.max_model_bytes {
            anyhow::bail!(
                "Model size {} exceeds maximum {}",
                bytes.len(),
                self.max_model_bytes
            );
        }

        let checksum = compute_checksum(bytes);
        if let Some(expected) = &self.expected_sha256 {
            if *expected != checksum {
                anyhow::bail!("Checksum mismatch: expected {}, got {}", expected, checksum);
            }
        }
        Ok(checksum)
    }
}

#[async_trait]
impl ModelLoader for OnnxModelLoader {
    async fn load(&self, input_len: usize) -> Result<Arc<dyn Predictor>> {
        let start = Instant::now();
        let bytes = self.read_bytes().await?;
        let checksum = self.verify(&bytes)?;
        let version = format!("sha256-{}", &checksum[..12]);

        let predictor = OnnxPredictor::from_bytes(&bytes, input_len, version.clone())?;

        info!(
            source = %self.source.describe(),
            size = bytes.len(),
            input_len,
            model_version = %version,
            elapsed_ms = start.elapsed().as_millis(),
            "Pricing model loaded"
        );
        Ok(Arc::new(predictor))
    }

    fn describe(&self) -> String {
        self.source.describe()
    }
}

/// Compute SHA256 checksum of data
fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
