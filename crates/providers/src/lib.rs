//! Provider adapters
//!
//! One adapter per capability: face swap, video generation (two
//! interchangeable implementations) and lip sync. Each adapter translates a
//! domain request into the generic task shape of `ugc-remote-task`, polls to
//! completion, and extracts the domain artifact URL from the provider's
//! output, handling the known output shapes explicitly.

mod faceswap;
mod lipsync;
mod output;
mod videogen;

pub use faceswap::{FaceSwapper, PiapiFaceSwap};
pub use lipsync::{LipSyncer, SyncioLipSync};
pub use videogen::{
    default_poller as video_generation_poller, video_generator, KlingVideoGen, LumaVideoGen,
    VideoGenerator, VIDEO_VARIANTS,
};

use ugc_common::{ProviderSettings, Result};
use ugc_remote_task::{AuthScheme, TaskClient};

/// Task client wired for the face-swap / video-generation provider
///
/// # Errors
/// Returns `Config` if the HTTP client cannot be built.
pub fn piapi_client(settings: &ProviderSettings) -> Result<TaskClient> {
    Ok(TaskClient::new(
        settings.base_url.clone(),
        settings.api_key.clone(),
        AuthScheme::Header("x-api-key"),
    )?
    .with_paths("/task", "/task", "/upload"))
}

/// Task client wired for the lip-sync provider
///
/// # Errors
/// Returns `Config` if the HTTP client cannot be built.
pub fn syncio_client(settings: &ProviderSettings) -> Result<TaskClient> {
    Ok(TaskClient::new(
        settings.base_url.clone(),
        settings.api_key.clone(),
        AuthScheme::Bearer,
    )?
    .with_paths("/generate", "/generate", "/upload"))
}
