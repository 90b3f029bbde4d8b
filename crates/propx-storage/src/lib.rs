//! JSON artifact sink and single-attempt HTTP fetcher.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info_span, Instrument};
use uuid::Uuid;

pub const CRATE_NAME: &str = "propx-storage";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub content_hash: String,
    pub path: PathBuf,
    pub byte_size: usize,
}

/// Writes one JSON document per run into a flat output directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sha256_hex(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        hex::encode(hasher.finalize())
    }

    /// `<TAG>_<YYYYmmdd_HHMMSS>.json`
    pub fn artifact_file_name(tag: &str, at: DateTime<Utc>) -> String {
        let tag = tag.trim();
        let tag = if tag.is_empty() { "ARTIFACT" } else { tag };
        format!("{tag}_{}.json", at.format("%Y%m%d_%H%M%S"))
    }

    pub async fn store_json<T: Serialize>(
        &self,
        tag: &str,
        at: DateTime<Utc>,
        value: &T,
    ) -> anyhow::Result<StoredArtifact> {
        let bytes = serde_json::to_vec_pretty(value).context("serializing artifact")?;
        self.store_bytes(&Self::artifact_file_name(tag, at), &bytes)
            .await
    }

    /// Temp file plus rename, so readers never observe a half-written artifact.
    /// A later write with the same name replaces the earlier one.
    pub async fn store_bytes(&self, file_name: &str, bytes: &[u8]) -> anyhow::Result<StoredArtifact> {
        fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("creating output directory {}", self.root.display()))?;

        let content_hash = Self::sha256_hex(bytes);
        let path = self.root.join(file_name);
        let temp_path = self
            .root
            .join(format!(".{}.{}.tmp", Uuid::new_v4(), bytes.len()));

        let mut file = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp_path)
            .await
            .with_context(|| format!("opening temp artifact file {}", temp_path.display()))?;
        file.write_all(bytes)
            .await
            .with_context(|| format!("writing temp artifact file {}", temp_path.display()))?;
        file.flush()
            .await
            .with_context(|| format!("flushing temp artifact file {}", temp_path.display()))?;
        drop(file);

        if let Err(err) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(err).with_context(|| {
                format!(
                    "atomically renaming temp artifact {} -> {}",
                    temp_path.display(),
                    path.display()
                )
            });
        }

        debug!(path = %path.display(), %content_hash, "artifact written");
        Ok(StoredArtifact {
            content_hash,
            path,
            byte_size: bytes.len(),
        })
    }

    pub async fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> anyhow::Result<T> {
        let path = path.as_ref();
        let data = fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_slice(&data).with_context(|| format!("parsing {}", path.display()))
    }
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub user_agent: Option<String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("http status {status} for {url}")]
    HttpStatus { status: u16, url: String },
    #[error("invalid json from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// One request, one attempt. Callers decide what a failure means.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: HttpClientConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(config.timeout);

        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        let client = builder.build().context("building reqwest client")?;
        Ok(Self { client })
    }

    pub async fn get_json(
        &self,
        url: &str,
        query: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> Result<serde_json::Value, FetchError> {
        let mut request = self.client.get(url).query(query);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let span = info_span!("http_fetch", method = "GET", url);
        send_json(request).instrument(span).await
    }

    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        headers: &[(&str, &str)],
    ) -> Result<serde_json::Value, FetchError> {
        let mut request = self.client.post(url).json(body);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let span = info_span!("http_fetch", method = "POST", url);
        send_json(request).instrument(span).await
    }
}

async fn send_json(request: reqwest::RequestBuilder) -> Result<serde_json::Value, FetchError> {
    let resp = request.send().await?;
    let status = resp.status();
    let final_url = resp.url().to_string();

    if !status.is_success() {
        return Err(FetchError::HttpStatus {
            status: status.as_u16(),
            url: final_url,
        });
    }

    let body = resp.bytes().await?;
    debug!(status = status.as_u16(), bytes = body.len(), "response received");
    serde_json::from_slice(&body).map_err(|source| FetchError::Decode {
        url: final_url,
        source,
    })
}
