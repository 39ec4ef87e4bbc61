//! Load-once cache for the preprocessing artifacts

use super::{
    ArtifactSource, PreprocessorArtifacts, MEDIANS_CONFIG, PREPROCESSOR_CONFIG, VECTORIZER_CONFIG,
};
use crate::error::{Result, ValuationError};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Loads the artifacts once and hands out the cached bundle afterwards.
///
/// Concurrent first callers await the same in-flight load. A failed load is
/// not cached, so the next call tries again.
pub struct ConfigLoader {
    source: Option<Arc<dyn ArtifactSource>>,
    cached: OnceCell<Arc<PreprocessorArtifacts>>,
}

impl ConfigLoader {
    pub fn new(source: Arc<dyn ArtifactSource>) -> Self {
        Self {
            source: Some(source),
            cached: OnceCell::new(),
        }
    }

    /// Loader over artifacts that are already in memory
    pub fn preloaded(artifacts: PreprocessorArtifacts) -> Self {
        Self {
            source: None,
            cached: OnceCell::new_with(Some(Arc::new(artifacts))),
        }
    }

    /// Return the cached artifacts, loading them on first use
    pub async fn load(&self) -> Result<Arc<PreprocessorArtifacts>> {
        self.cached
            .get_or_try_init(|| self.fetch_all())
            .await
            .cloned()
    }

    /// Artifacts if a previous load succeeded
    pub fn loaded(&self) -> Option<Arc<PreprocessorArtifacts>> {
        self.cached.get().cloned()
    }

    async fn fetch_all(&self) -> Result<Arc<PreprocessorArtifacts>> {
        let source = self.source.as_ref().ok_or_else(|| {
            ValuationError::config_load(PREPROCESSOR_CONFIG, "no artifact source configured")
        })?;
        let start = Instant::now();
        debug!(source = %source.describe(), "Loading preprocessing artifacts");

        let (preprocessor, vectorizer, medians) = tokio::try_join!(
            read_artifact(source.as_ref(), PREPROCESSOR_CONFIG),
            read_artifact(source.as_ref(), VECTORIZER_CONFIG),
            read_artifact(source.as_ref(), MEDIANS_CONFIG),
        )?;

        let artifacts = PreprocessorArtifacts::from_json(&preprocessor, &vectorizer, &medians)
            .inspect_err(|e| warn!(error = %e, "Preprocessing artifacts rejected"))?;

        info!(
            source = %source.describe(),
            vector_len = artifacts.vector_len(),
            vocabulary = artifacts.vectorizer.vocabulary.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Preprocessing artifacts loaded"
        );
        Ok(Arc::new(artifacts))
    }
}

async fn read_artifact(source: &dyn ArtifactSource, name: &str) -> Result<Vec<u8>> {
    source.read(name).await.map_err(|e| {
        warn!(artifact = name, error = %e, "Artifact unreachable");
        ValuationError::config_load(name, format!("{:#}", e))
    })
}
