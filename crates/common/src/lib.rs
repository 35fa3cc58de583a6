//! Common types and utilities for the UGC media pipeline
//!
//! Shared error taxonomy, remote task model, provider selection and
//! environment-backed settings used by every pipeline crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("upload to provider failed: {0}")]
    UploadFailed(String),

    #[error("provider rejected request: {0}")]
    ProviderRejected(String),

    #[error("remote task failed: {0}")]
    TaskFailed(String),

    #[error("no terminal status after {attempts} poll attempts")]
    PollTimeout { attempts: u32 },

    #[error("download failed for {url}: {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error("frame extraction failed at {timestamp}s: {reason}")]
    FrameExtraction { timestamp: f64, reason: String },

    #[error("unrecognized provider response: {0}")]
    UnexpectedOutputShape(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Normalized status of a remote provider task
///
/// Providers report status in different vocabularies (`COMPLETED` vs
/// `completed`, `processing` vs `running`); adapters normalize everything
/// into this enum. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Whether no further status transition can occur
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Normalize a provider-reported status word
    ///
    /// # Errors
    /// Returns `UnexpectedOutputShape` for a status word outside every known
    /// provider vocabulary.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "completed" | "success" | "succeeded" => Ok(TaskStatus::Completed),
            "failed" | "error" | "cancelled" => Ok(TaskStatus::Failed),
            "queued" | "pending" | "submitted" | "staged" => Ok(TaskStatus::Queued),
            "running" | "processing" | "in_progress" | "generating" => Ok(TaskStatus::Running),
            other => Err(PipelineError::UnexpectedOutputShape(format!(
                "unknown task status: {other:?}"
            ))),
        }
    }
}

/// Capability a remote task was submitted for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    FaceSwap,
    VideoGeneration,
    LipSync,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::FaceSwap => write!(f, "face_swap"),
            TaskKind::VideoGeneration => write!(f, "video_generation"),
            TaskKind::LipSync => write!(f, "lip_sync"),
        }
    }
}

/// Handle returned by a provider on task submission
///
/// Immutable after creation; owned by the adapter/poller pair that created it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteTask {
    /// Provider-assigned task identifier
    pub provider_task_id: String,
    /// Capability the task was submitted for
    pub kind: TaskKind,
    /// Submission timestamp
    pub submitted_at: DateTime<Utc>,
}

/// Which interchangeable video-generation adapter satisfies a run
///
/// Scoped per pipeline run: threaded through each generate request rather
/// than held in process-wide state, so concurrent runs cannot observe each
/// other's choice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoProvider {
    #[default]
    Kling,
    Luma,
}

impl fmt::Display for VideoProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoProvider::Kling => write!(f, "kling"),
            VideoProvider::Luma => write!(f, "luma"),
        }
    }
}

/// Credentials and base URL for one remote provider
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub base_url: String,
    pub api_key: String,
}

/// Process configuration, read from the environment
///
/// API keys are opaque secrets; no validation beyond presence.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Task provider for face swap and video generation
    pub piapi: ProviderSettings,
    /// URL prefix of images already hosted on the task provider's storage
    ///
    /// Upload responses mint URLs under this prefix, not under the API base;
    /// swap images already carrying it are passed through without rehosting.
    pub piapi_storage_prefix: String,
    /// Lip-sync provider
    pub syncio: ProviderSettings,
    /// Root for intermediate and downloaded artifacts
    pub temp_dir: PathBuf,
    /// Publicly servable artifact directory
    pub public_dir: PathBuf,
    /// URL prefix under which the public directory is served
    pub public_base: String,
}

impl Settings {
    /// Load settings from process environment variables
    ///
    /// # Errors
    /// Returns `Config` if a required API key is unset.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            piapi: ProviderSettings {
                base_url: env_or("PIAPI_BASE_URL", "https://app.piapi.ai/api/v2"),
                api_key: require_env("PIAPI_KEY")?,
            },
            piapi_storage_prefix: env_or("PIAPI_STORAGE_PREFIX", "https://img.theapi.app"),
            syncio: ProviderSettings {
                base_url: env_or("SYNCIO_BASE_URL", "https://api.sync.so/v2"),
                api_key: require_env("SYNCIO_API_KEY")?,
            },
            temp_dir: std::env::var("UGC_TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| std::env::temp_dir().join("ugc-pipeline")),
            public_dir: std::env::var("UGC_PUBLIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("public/temp")),
            public_base: env_or("UGC_PUBLIC_BASE", "/temp"),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| PipelineError::Config(format!("{key} is not set")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_normalization() {
        assert_eq!(TaskStatus::parse("completed").unwrap(), TaskStatus::Completed);
        assert_eq!(TaskStatus::parse("COMPLETED").unwrap(), TaskStatus::Completed);
        assert_eq!(TaskStatus::parse("Success").unwrap(), TaskStatus::Completed);
        assert_eq!(TaskStatus::parse("FAILED").unwrap(), TaskStatus::Failed);
        assert_eq!(TaskStatus::parse("error").unwrap(), TaskStatus::Failed);
        assert_eq!(TaskStatus::parse("pending").unwrap(), TaskStatus::Queued);
        assert_eq!(TaskStatus::parse("staged").unwrap(), TaskStatus::Queued);
        assert_eq!(TaskStatus::parse("PROCESSING").unwrap(), TaskStatus::Running);
        assert_eq!(TaskStatus::parse("generating").unwrap(), TaskStatus::Running);
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let err = TaskStatus::parse("transmogrifying").unwrap_err();
        assert!(matches!(err, PipelineError::UnexpectedOutputShape(_)));
    }

    #[test]
    fn test_terminal_states() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(!TaskStatus::Queued.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
    }

    #[test]
    fn test_default_video_provider() {
        assert_eq!(VideoProvider::default(), VideoProvider::Kling);
    }

    #[test]
    fn test_storage_prefix_is_not_the_api_base() {
        std::env::set_var("PIAPI_KEY", "k");
        std::env::set_var("SYNCIO_API_KEY", "k");
        let settings = Settings::from_env().unwrap();
        assert_eq!(settings.piapi_storage_prefix, "https://img.theapi.app");
        assert!(!settings.piapi_storage_prefix.starts_with(&settings.piapi.base_url));
    }

    #[test]
    fn test_video_provider_serde() {
        let p: VideoProvider = serde_json::from_str("\"luma\"").unwrap();
        assert_eq!(p, VideoProvider::Luma);
        assert_eq!(serde_json::to_string(&VideoProvider::Kling).unwrap(), "\"kling\"");
    }
}
