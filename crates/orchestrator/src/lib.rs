//! Pipeline stage runner
//!
//! Sequences the media pipeline stages (download → extract frames →
//! face swap → video generation, plus the independent lip-sync stage),
//! resolving each stage's inputs from the previous stage's result and
//! materializing every provider output through the artifact store. Stages
//! are pure functions of their typed requests; a failure aborts the run and
//! upstream artifacts stay on disk.

mod downloader;
mod runner;
mod stages;

pub use downloader::VideoDownloader;
pub use runner::PipelineRunner;
pub use stages::{
    DownloadRequest, DownloadResult, FaceSwapRequest, FaceSwapResult, FrameArtifact,
    GenerateVideoRequest, GenerateVideoResult, LipSyncRequest, LipSyncResult,
};
