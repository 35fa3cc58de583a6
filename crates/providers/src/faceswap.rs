//! Face-swap adapter

use async_trait::async_trait;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use ugc_artifact_store::ArtifactStore;
use ugc_common::{PipelineError, Result, TaskKind};
use ugc_remote_task::{Poller, TaskApi, TaskPayload};

/// Capability: swap a face onto a target image
#[async_trait]
pub trait FaceSwapper: Send + Sync {
    /// Returns the URL of the swapped image on the provider's storage
    async fn swap(&self, target_image: &Path, swap_image_url: &str) -> Result<String>;
}

/// Face-swap via the PiAPI image toolkit
pub struct PiapiFaceSwap {
    api: Arc<dyn TaskApi>,
    poller: Poller,
    store: Arc<ArtifactStore>,
    /// URL prefix of images already on the provider's storage
    storage_prefix: String,
}

impl PiapiFaceSwap {
    /// Default poll cadence for face-swap tasks: 2s × 150 (5 minutes)
    #[must_use]
    pub fn default_poller() -> Poller {
        Poller::new(Duration::from_secs(2), 150)
    }

    pub fn new(
        api: Arc<dyn TaskApi>,
        poller: Poller,
        store: Arc<ArtifactStore>,
        storage_prefix: impl Into<String>,
    ) -> Self {
        Self {
            api,
            poller,
            store,
            storage_prefix: storage_prefix.into(),
        }
    }

    /// Resolve the swap image to a URL the provider accepts
    ///
    /// The provider rejects URLs outside its own storage, so a third-party
    /// URL is first materialized locally and re-uploaded. A local path is
    /// uploaded directly.
    async fn resolve_swap_source(&self, source: &str) -> Result<String> {
        if source.starts_with(&self.storage_prefix) {
            return Ok(source.to_string());
        }

        if source.starts_with("http://") || source.starts_with("https://") {
            info!("Rehosting third-party swap image: {}", source);
            let local = self.store.materialize(source).await?;
            return self.api.upload(&local).await;
        }

        let path = Path::new(source);
        if path.exists() {
            return self.api.upload(path).await;
        }

        Err(PipelineError::Validation(format!(
            "swap image is neither a URL nor an existing file: {source}"
        )))
    }
}

#[async_trait]
impl FaceSwapper for PiapiFaceSwap {
    async fn swap(&self, target_image: &Path, swap_image_url: &str) -> Result<String> {
        let target_url = self.api.upload(target_image).await?;
        let swap_url = self.resolve_swap_source(swap_image_url).await?;

        let payload = json!({
            "model": "Qubico/image-toolkit",
            "task_type": "face-swap",
            "input": {
                "target_image": target_url,
                "swap_image": swap_url,
            },
        });

        let task = self.api.submit(TaskKind::FaceSwap, TaskPayload::Json(payload)).await?;
        info!("Face-swap task submitted: {}", task.provider_task_id);

        let output = self
            .poller
            .await_completion(self.api.as_ref(), &task.provider_task_id)
            .await?;

        crate::output::image_url(&output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use tempfile::TempDir;
    use ugc_common::{RemoteTask, TaskStatus};
    use ugc_remote_task::StatusSnapshot;

    /// Fake provider: records uploads, completes every task with the given
    /// output
    struct FakeApi {
        uploads: Mutex<Vec<String>>,
        output: Value,
    }

    impl FakeApi {
        fn completing_with(output: Value) -> Self {
            Self {
                uploads: Mutex::new(Vec::new()),
                output,
            }
        }
    }

    #[async_trait]
    impl TaskApi for FakeApi {
        async fn submit(&self, kind: TaskKind, _payload: TaskPayload) -> Result<RemoteTask> {
            Ok(RemoteTask {
                provider_task_id: "fs-1".to_string(),
                kind,
                submitted_at: chrono::Utc::now(),
            })
        }

        async fn upload(&self, file: &Path) -> Result<String> {
            let name = file.file_name().unwrap().to_string_lossy().into_owned();
            self.uploads.lock().unwrap().push(name.clone());
            Ok(format!("https://storage.provider.example/{name}"))
        }

        async fn fetch_status(&self, _task_id: &str) -> Result<StatusSnapshot> {
            Ok(StatusSnapshot {
                status: TaskStatus::Completed,
                output: Some(self.output.clone()),
                error: None,
            })
        }
    }

    fn test_store(dir: &TempDir) -> Arc<ArtifactStore> {
        Arc::new(
            ArtifactStore::new(
                dir.path().join("tmp"),
                dir.path().join("public"),
                "/temp",
            )
            .unwrap(),
        )
    }

    fn fast_poller() -> Poller {
        Poller::new(Duration::from_millis(1), 5)
    }

    #[tokio::test]
    async fn test_swap_uploads_target_and_extracts_image_url() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("frame0.jpg");
        std::fs::write(&target, b"jpeg").unwrap();

        let api = Arc::new(FakeApi::completing_with(
            json!({"image_url": "https://cdn.example/swapped.jpg"}),
        ));
        let swapper = PiapiFaceSwap::new(
            api.clone(),
            fast_poller(),
            test_store(&dir),
            "https://storage.provider.example",
        );

        let url = swapper
            .swap(&target, "https://storage.provider.example/face.jpg")
            .await
            .unwrap();

        assert_eq!(url, "https://cdn.example/swapped.jpg");
        // Provider-hosted swap image is used as-is; only the target uploads
        assert_eq!(*api.uploads.lock().unwrap(), vec!["frame0.jpg".to_string()]);
    }

    #[tokio::test]
    async fn test_local_swap_image_is_uploaded() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("frame0.jpg");
        let face = dir.path().join("face.png");
        std::fs::write(&target, b"jpeg").unwrap();
        std::fs::write(&face, b"png").unwrap();

        let api = Arc::new(FakeApi::completing_with(
            json!({"image": "https://cdn.example/swapped2.jpg"}),
        ));
        let swapper = PiapiFaceSwap::new(
            api.clone(),
            fast_poller(),
            test_store(&dir),
            "https://storage.provider.example",
        );

        let url = swapper.swap(&target, face.to_str().unwrap()).await.unwrap();
        assert_eq!(url, "https://cdn.example/swapped2.jpg");
        assert_eq!(api.uploads.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unusable_swap_source_is_rejected() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("frame0.jpg");
        std::fs::write(&target, b"jpeg").unwrap();

        let api = Arc::new(FakeApi::completing_with(json!({})));
        let swapper = PiapiFaceSwap::new(
            api,
            fast_poller(),
            test_store(&dir),
            "https://storage.provider.example",
        );

        let err = swapper.swap(&target, "/no/such/file.jpg").await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }
}
