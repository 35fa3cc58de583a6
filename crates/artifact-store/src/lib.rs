//! Local materialization of pipeline artifacts
//!
//! Providers communicate only via URLs while stages communicate via local
//! paths, so every stage boundary goes through this store: download a remote
//! artifact into uniquely named temp storage, or copy a local artifact into
//! the publicly servable directory and mint its stable URL.

mod frames;

use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use ugc_common::{PipelineError, Result};
use uuid::Uuid;

/// Artifact store rooted at a temp directory and a public directory
///
/// The public URL for a published artifact is `{public_base}/{filename}`.
/// Publishing is idempotent by filename: a published copy is never
/// overwritten, so the local path and its URL always refer to byte-identical
/// content. The store never deletes artifacts; cleanup is external.
pub struct ArtifactStore {
    http: reqwest::Client,
    temp_dir: PathBuf,
    public_dir: PathBuf,
    public_base: String,
}

impl ArtifactStore {
    /// Create a store, ensuring both directories exist
    ///
    /// # Errors
    /// Returns `Config` if the HTTP client cannot be built, `Io` if a
    /// directory cannot be created.
    pub fn new(temp_dir: PathBuf, public_dir: PathBuf, public_base: impl Into<String>) -> Result<Self> {
        std::fs::create_dir_all(&temp_dir)?;
        std::fs::create_dir_all(&public_dir)?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| PipelineError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            temp_dir,
            public_dir,
            public_base: into_trimmed_base(public_base.into()),
        })
    }

    /// Mint a unique temp path with the given extension
    #[must_use]
    pub fn temp_path(&self, extension: &str) -> PathBuf {
        self.temp_dir.join(format!("{}.{extension}", Uuid::new_v4()))
    }

    /// Download a remote URL into a uniquely named local temp file
    ///
    /// # Errors
    /// `DownloadFailed` on an unsupported scheme, transport error or non-2xx
    /// response.
    pub async fn materialize(&self, url: &str) -> Result<PathBuf> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(PipelineError::DownloadFailed {
                url: url.to_string(),
                reason: "only http:// and https:// URLs are supported".to_string(),
            });
        }

        info!("Downloading artifact from {}", url);
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| PipelineError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(PipelineError::DownloadFailed {
                url: url.to_string(),
                reason: format!("HTTP status {}", response.status()),
            });
        }

        let extension = extension_from_url(url)
            .or_else(|| {
                response
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|ct| ct.to_str().ok())
                    .and_then(extension_from_content_type)
            })
            .unwrap_or("bin");

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PipelineError::DownloadFailed {
                url: url.to_string(),
                reason: format!("failed to read body: {e}"),
            })?;

        let path = self.temp_path(extension);
        tokio::fs::write(&path, &bytes).await?;
        debug!("Materialized {} bytes to {}", bytes.len(), path.display());

        Ok(path)
    }

    /// Copy a local file into the public directory and return its URL
    ///
    /// Keyed by filename, not content hash: re-publishing the same path
    /// returns the same URL without re-copying, and an existing published
    /// copy is never overwritten.
    ///
    /// # Errors
    /// `Validation` if the path has no filename, `Io` on copy failure.
    pub fn publish(&self, local: &Path) -> Result<String> {
        let file_name = local
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                PipelineError::Validation(format!("cannot publish path without a filename: {}", local.display()))
            })?;

        let destination = self.public_dir.join(file_name);
        if !destination.exists() {
            std::fs::copy(local, &destination)?;
            debug!("Published {} to {}", local.display(), destination.display());
        }

        Ok(format!("{}/{file_name}", self.public_base))
    }

    /// Resolve a public URL minted by [`publish`](Self::publish) back to its
    /// file in the public directory
    #[must_use]
    pub fn published_path(&self, public_url: &str) -> Option<PathBuf> {
        let file_name = public_url.strip_prefix(&self.public_base)?.strip_prefix('/')?;
        let path = self.public_dir.join(file_name);
        path.exists().then_some(path)
    }

    /// Persist an uploaded file under a unique name, keeping its extension
    ///
    /// # Errors
    /// `Io` on write failure.
    pub async fn store_upload(&self, original_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let extension = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("jpg");

        let path = self.temp_path(extension);
        tokio::fs::write(&path, bytes).await?;
        info!("Stored upload {} ({} bytes) as {}", original_name, bytes.len(), path.display());

        Ok(path)
    }

    /// Extract one still image per requested timestamp from a local video
    ///
    /// Each timestamp is tried against an ordered list of ffmpeg invocation
    /// strategies; a strategy failure is logged as a retry and the next one
    /// is attempted.
    ///
    /// # Errors
    /// `FrameExtraction` for the first timestamp where every strategy fails.
    pub async fn extract_frames(&self, video: &Path, time_points: &[f64]) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::with_capacity(time_points.len());
        for &timestamp in time_points {
            let output = self.temp_path("jpg");
            frames::extract_frame(video, timestamp, &output).await?;
            paths.push(output);
        }
        Ok(paths)
    }
}

fn into_trimmed_base(base: String) -> String {
    base.trim_end_matches('/').to_string()
}

fn extension_from_url(url: &str) -> Option<&'static str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let ext = path.rsplit('.').next()?;
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("jpg"),
        "png" => Some("png"),
        "webp" => Some("webp"),
        "gif" => Some("gif"),
        "mp4" => Some("mp4"),
        "mov" => Some("mov"),
        "webm" => Some("webm"),
        "mp3" => Some("mp3"),
        "wav" => Some("wav"),
        "m4a" => Some("m4a"),
        _ => None,
    }
}

fn extension_from_content_type(content_type: &str) -> Option<&'static str> {
    match content_type.split(';').next().unwrap_or("").trim() {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "video/mp4" => Some("mp4"),
        "video/quicktime" => Some("mov"),
        "video/webm" => Some("webm"),
        "audio/mpeg" => Some("mp3"),
        "audio/wav" | "audio/x-wav" => Some("wav"),
        _ => None,
    }
}
