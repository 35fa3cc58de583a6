//! Lip-sync adapter

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use ugc_common::{Result, TaskKind};
use ugc_remote_task::{MultipartField, Poller, TaskApi, TaskPayload};

/// Capability: re-sync a video's mouth movement to an audio track
#[async_trait]
pub trait LipSyncer: Send + Sync {
    /// Returns the URL of the synced video on the provider's storage
    async fn sync(&self, video: &Path, audio: &Path) -> Result<String>;
}

/// Lip-sync via the sync.so generate API
pub struct SyncioLipSync {
    api: Arc<dyn TaskApi>,
    poller: Poller,
}

impl SyncioLipSync {
    /// Default poll cadence for lip-sync jobs: 5s × 120 (10 minutes)
    #[must_use]
    pub fn default_poller() -> Poller {
        Poller::new(Duration::from_secs(5), 120)
    }

    pub fn new(api: Arc<dyn TaskApi>, poller: Poller) -> Self {
        Self { api, poller }
    }
}

#[async_trait]
impl LipSyncer for SyncioLipSync {
    async fn sync(&self, video: &Path, audio: &Path) -> Result<String> {
        let payload = TaskPayload::Multipart(vec![
            MultipartField::File {
                name: "video".to_string(),
                path: video.to_path_buf(),
            },
            MultipartField::File {
                name: "audio".to_string(),
                path: audio.to_path_buf(),
            },
            MultipartField::Text {
                name: "model".to_string(),
                value: "lipsync-2".to_string(),
            },
        ]);

        let task = self.api.submit(TaskKind::LipSync, payload).await?;
        info!("Lip-sync job submitted: {}", task.provider_task_id);

        let output = self
            .poller
            .await_completion(self.api.as_ref(), &task.provider_task_id)
            .await?;

        crate::output::sync_output_url(&output)
    }
}
