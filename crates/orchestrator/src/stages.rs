//! Typed stage contracts
//!
//! Each stage's request is built from the preceding stage's result plus
//! user-supplied parameters; there is no shared mutable pipeline state.
//! Wire names are camelCase to match the node-editor clients.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use ugc_common::VideoProvider;

/// A frame extracted from the source video, published for provider access
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameArtifact {
    /// Human-readable position, e.g. "start frame" or "5-second frame"
    pub label: String,
    pub path: PathBuf,
    pub url: String,
}

/// Download stage input: a source video URL
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    #[serde(default)]
    pub tiktok_url: String,
}

/// Download stage output: the local video plus its extracted key frames
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResult {
    pub video_path: PathBuf,
    pub frames: Vec<FrameArtifact>,
}

/// Face-swap stage input: the two extracted frames and the face to swap in
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceSwapRequest {
    #[serde(default)]
    pub frame0_path: String,
    #[serde(default)]
    pub frame5_path: String,
    #[serde(default)]
    pub swap_image_url: String,
}

/// Face-swap stage output: both swapped frames, local and published
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceSwapResult {
    pub swapped_frame0_path: PathBuf,
    pub swapped_frame5_path: PathBuf,
    pub swapped_frame0_url: String,
    pub swapped_frame5_url: String,
}

/// Video-generation stage input: the two swapped-frame URLs and a prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateVideoRequest {
    #[serde(default)]
    pub first_frame_url: String,
    #[serde(default)]
    pub last_frame_url: String,
    #[serde(default)]
    pub prompt: String,
    /// Per-run provider selection; defaults to Kling
    #[serde(default)]
    pub provider: VideoProvider,
}

/// Video-generation stage output: all candidate variants, local and published
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateVideoResult {
    pub video_paths: Vec<PathBuf>,
    pub video_urls: Vec<String>,
}

/// Lip-sync stage input: a source video URL and an audio track URL
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LipSyncRequest {
    #[serde(default)]
    pub tiktok_url: String,
    #[serde(default)]
    pub audio_url: String,
}

/// Lip-sync stage output
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LipSyncResult {
    pub lipsynced_video_path: PathBuf,
    pub lipsynced_video_url: String,
}
