//! Video-generation adapters
//!
//! Two interchangeable implementations behind one trait, selected per
//! pipeline run. Both submit three identical tasks and join on all of them:
//! the caller gets either all three candidate URLs or a failure, never a
//! partial list.

use async_trait::async_trait;
use futures::future::try_join_all;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use ugc_common::{Result, TaskKind, VideoProvider};
use ugc_remote_task::{Poller, TaskApi, TaskPayload};

/// Number of candidate variants generated per request
pub const VIDEO_VARIANTS: usize = 3;

/// Capability: generate candidate videos between two key frames
#[async_trait]
pub trait VideoGenerator: Send + Sync {
    /// Returns exactly [`VIDEO_VARIANTS`] video URLs, or fails as a whole
    async fn generate(
        &self,
        first_frame_url: &str,
        last_frame_url: &str,
        prompt: &str,
    ) -> Result<Vec<String>>;
}

/// Default poll cadence for video tasks: 5s × 180 (15 minutes)
#[must_use]
pub fn default_poller() -> Poller {
    Poller::new(Duration::from_secs(5), 180)
}

/// Select the generator implementation for one pipeline run
#[must_use]
pub fn video_generator(
    choice: VideoProvider,
    api: Arc<dyn TaskApi>,
    poller: Poller,
) -> Arc<dyn VideoGenerator> {
    match choice {
        VideoProvider::Kling => Arc::new(KlingVideoGen::new(api, poller)),
        VideoProvider::Luma => Arc::new(LumaVideoGen::new(api, poller)),
    }
}

/// Submit the same payload [`VIDEO_VARIANTS`] times, poll all concurrently,
/// and extract every output URL
///
/// The first failure rejects the whole call; sibling remote tasks keep
/// running on the provider but their results are discarded.
async fn run_variants(api: &Arc<dyn TaskApi>, poller: &Poller, payload: Value) -> Result<Vec<String>> {
    let submissions = (0..VIDEO_VARIANTS)
        .map(|_| api.submit(TaskKind::VideoGeneration, TaskPayload::Json(payload.clone())));
    let tasks = try_join_all(submissions).await?;
    info!(
        "Video-generation tasks submitted: {:?}",
        tasks.iter().map(|t| t.provider_task_id.as_str()).collect::<Vec<_>>()
    );

    let polls = tasks
        .iter()
        .map(|task| poller.await_completion(api.as_ref(), &task.provider_task_id));
    let outputs = try_join_all(polls).await?;

    outputs.iter().map(crate::output::video_url).collect()
}

/// Kling-style image-to-video generation
pub struct KlingVideoGen {
    api: Arc<dyn TaskApi>,
    poller: Poller,
}

impl KlingVideoGen {
    pub fn new(api: Arc<dyn TaskApi>, poller: Poller) -> Self {
        Self { api, poller }
    }
}

#[async_trait]
impl VideoGenerator for KlingVideoGen {
    async fn generate(
        &self,
        first_frame_url: &str,
        last_frame_url: &str,
        prompt: &str,
    ) -> Result<Vec<String>> {
        let payload = json!({
            "model": "kling",
            "task_type": "video_generation",
            "input": {
                "prompt": prompt,
                "image_url": first_frame_url,
                "image_tail_url": last_frame_url,
                "mode": "pro",
                "version": "2.0",
                "aspect_ratio": "16:9",
            },
            "config": { "service_mode": "public" },
        });

        run_variants(&self.api, &self.poller, payload).await
    }
}

/// Luma-style key-frame video generation
pub struct LumaVideoGen {
    api: Arc<dyn TaskApi>,
    poller: Poller,
}

impl LumaVideoGen {
    pub fn new(api: Arc<dyn TaskApi>, poller: Poller) -> Self {
        Self { api, poller }
    }
}

#[async_trait]
impl VideoGenerator for LumaVideoGen {
    async fn generate(
        &self,
        first_frame_url: &str,
        last_frame_url: &str,
        prompt: &str,
    ) -> Result<Vec<String>> {
        let payload = json!({
            "model": "luma",
            "task_type": "video_generation",
            "input": {
                "prompt": prompt,
                "key_frames": {
                    "frame0": { "type": "image", "url": first_frame_url },
                    "frame1": { "type": "image", "url": last_frame_url },
                },
                "model_name": "ray-v2",
                "duration": 5,
                "aspect_ratio": "16:9",
            },
            "config": { "service_mode": "public" },
        });

        run_variants(&self.api, &self.poller, payload).await
    }
}
