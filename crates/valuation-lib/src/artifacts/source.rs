//! Where preprocessing artifacts are read from

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Timeout for fetching a single artifact over HTTP
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// A location holding the exported artifact documents by file name
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Read the raw bytes of the named artifact
    async fn read(&self, name: &str) -> Result<Vec<u8>>;

    /// Human-readable location, used in logs
    fn describe(&self) -> String;
}

/// Artifacts stored as files in a local directory
#[derive(Debug, Clone)]
pub struct FileArtifactSource {
    dir: PathBuf,
}

impl FileArtifactSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ArtifactSource for FileArtifactSource {
    async fn read(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.dir.join(name);
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read {:?}", path))
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}

/// Artifacts served over HTTP below a base URL
#[derive(Debug, Clone)]
pub struct HttpArtifactSource {
    client: Client,
    base_url: Url,
}

impl HttpArtifactSource {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        let mut base_url = Url::parse(base_url).context("Invalid artifact base URL")?;
        // Url::join replaces the last segment unless the path ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl ArtifactSource for HttpArtifactSource {
    async fn read(&self, name: &str) -> Result<Vec<u8>> {
        let url = self.base_url.join(name).context("Invalid artifact path")?;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!("Fetching {} returned {}", url, response.status());
        }

        let bytes = response.bytes().await.context("Failed to read response body")?;
        Ok(bytes.to_vec())
    }

    fn describe(&self) -> String {
        self.base_url.to_string()
    }
}
