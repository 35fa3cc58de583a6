//! Source video download with strategy fallback
//!
//! Social-media URLs need yt-dlp to resolve the actual media stream; plain
//! file URLs do not. The strategies are tried in order and the first success
//! short-circuits, with each miss logged as a retry.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{info, warn};
use ugc_artifact_store::ArtifactStore;
use ugc_common::{PipelineError, Result};

/// Downloads a source video into temp storage
pub struct VideoDownloader {
    store: Arc<ArtifactStore>,
}

impl VideoDownloader {
    pub fn new(store: Arc<ArtifactStore>) -> Self {
        Self { store }
    }

    /// Download the video at `url` to a local temp file
    ///
    /// # Errors
    /// `Validation` for a non-http(s) URL, `DownloadFailed` once every
    /// strategy has failed.
    pub async fn download(&self, url: &str) -> Result<PathBuf> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(PipelineError::Validation(format!(
                "video URL must be http(s): {url}"
            )));
        }

        match self.via_ytdlp(url).await {
            Ok(path) => {
                info!("Downloaded {} via yt-dlp to {}", url, path.display());
                return Ok(path);
            }
            Err(reason) => {
                warn!("yt-dlp download of {} failed, retrying with direct HTTP: {}", url, reason);
            }
        }

        match self.store.materialize(url).await {
            Ok(path) => {
                info!("Downloaded {} via direct HTTP to {}", url, path.display());
                Ok(path)
            }
            Err(e) => Err(PipelineError::DownloadFailed {
                url: url.to_string(),
                reason: format!("all download strategies failed, last: {e}"),
            }),
        }
    }

    async fn via_ytdlp(&self, url: &str) -> std::result::Result<PathBuf, String> {
        let output_path = self.store.temp_path("mp4");

        let result = Command::new("yt-dlp")
            .arg(url)
            .arg("-o")
            .arg(&output_path)
            .args(["-f", "mp4", "--no-check-certificates"])
            .output()
            .await
            .map_err(|e| format!("failed to spawn yt-dlp: {e}"))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(format!("yt-dlp exited with {}: {}", result.status, stderr.trim()));
        }
        if !output_path.exists() {
            return Err("yt-dlp reported success but produced no file".to_string());
        }

        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_rejects_non_http_url() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(
            ArtifactStore::new(dir.path().join("tmp"), dir.path().join("public"), "/temp").unwrap(),
        );
        let downloader = VideoDownloader::new(store);

        let err = downloader.download("file:///etc/passwd").await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }
}
