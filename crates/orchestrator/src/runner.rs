//! Stage execution

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use ugc_artifact_store::ArtifactStore;
use ugc_common::{PipelineError, Result, VideoProvider};
use ugc_providers::{FaceSwapper, LipSyncer, VideoGenerator};

use crate::downloader::VideoDownloader;
use crate::stages::{
    DownloadRequest, DownloadResult, FaceSwapRequest, FaceSwapResult, FrameArtifact,
    GenerateVideoRequest, GenerateVideoResult, LipSyncRequest, LipSyncResult,
};

/// Timestamps (seconds) of the key frames driving video generation
const FRAME_TIME_POINTS: [f64; 2] = [0.0, 5.0];

/// Executes pipeline stages against the configured providers
///
/// Each `run_*` method is one stage: a pure function of its request. There
/// is no automatic retry across stages and no rollback; a failed stage
/// leaves upstream artifacts on disk. Run state lives entirely in the call
/// chain, never across process restarts.
pub struct PipelineRunner {
    store: Arc<ArtifactStore>,
    downloader: VideoDownloader,
    face_swapper: Arc<dyn FaceSwapper>,
    kling: Arc<dyn VideoGenerator>,
    luma: Arc<dyn VideoGenerator>,
    lip_syncer: Arc<dyn LipSyncer>,
}

impl PipelineRunner {
    pub fn new(
        store: Arc<ArtifactStore>,
        face_swapper: Arc<dyn FaceSwapper>,
        kling: Arc<dyn VideoGenerator>,
        luma: Arc<dyn VideoGenerator>,
        lip_syncer: Arc<dyn LipSyncer>,
    ) -> Self {
        Self {
            downloader: VideoDownloader::new(store.clone()),
            store,
            face_swapper,
            kling,
            luma,
            lip_syncer,
        }
    }

    /// Download stage: fetch the source video and extract its key frames
    pub async fn run_download(&self, request: DownloadRequest) -> Result<DownloadResult> {
        let url = required(&request.tiktok_url, "tiktokUrl")?;

        let video_path = self.downloader.download(url).await?;
        let frame_paths = self
            .store
            .extract_frames(&video_path, &FRAME_TIME_POINTS)
            .await?;

        let mut frames = Vec::with_capacity(frame_paths.len());
        for (path, &timestamp) in frame_paths.into_iter().zip(FRAME_TIME_POINTS.iter()) {
            let url = self.store.publish(&path)?;
            frames.push(FrameArtifact {
                label: frame_label(timestamp),
                path,
                url,
            });
        }

        info!("Download stage complete: {} frames from {}", frames.len(), url);
        Ok(DownloadResult { video_path, frames })
    }

    /// Face-swap stage: swap the face onto both extracted frames
    pub async fn run_face_swap(&self, request: FaceSwapRequest) -> Result<FaceSwapResult> {
        let frame0 = existing_file(required(&request.frame0_path, "frame0Path")?)?;
        let frame5 = existing_file(required(&request.frame5_path, "frame5Path")?)?;
        let swap_image_url = required(&request.swap_image_url, "swapImageUrl")?;

        let swapped0_url = self.face_swapper.swap(&frame0, swap_image_url).await?;
        let swapped5_url = self.face_swapper.swap(&frame5, swap_image_url).await?;

        let swapped_frame0_path = self.store.materialize(&swapped0_url).await?;
        let swapped_frame5_path = self.store.materialize(&swapped5_url).await?;

        let result = FaceSwapResult {
            swapped_frame0_url: self.store.publish(&swapped_frame0_path)?,
            swapped_frame5_url: self.store.publish(&swapped_frame5_path)?,
            swapped_frame0_path,
            swapped_frame5_path,
        };

        info!("Face-swap stage complete");
        Ok(result)
    }

    /// Video-generation stage: produce all candidate variants
    pub async fn run_generate_video(&self, request: GenerateVideoRequest) -> Result<GenerateVideoResult> {
        let first = required(&request.first_frame_url, "firstFrameUrl")?;
        let last = required(&request.last_frame_url, "lastFrameUrl")?;
        let prompt = required(&request.prompt, "prompt")?;

        let remote_urls = self
            .generator(request.provider)
            .generate(first, last, prompt)
            .await?;

        let mut video_paths = Vec::with_capacity(remote_urls.len());
        let mut video_urls = Vec::with_capacity(remote_urls.len());
        for remote_url in &remote_urls {
            let path = self.store.materialize(remote_url).await?;
            video_urls.push(self.store.publish(&path)?);
            video_paths.push(path);
        }

        info!(
            "Video-generation stage complete: {} variants via {}",
            video_paths.len(),
            request.provider
        );
        Ok(GenerateVideoResult {
            video_paths,
            video_urls,
        })
    }

    /// Lip-sync stage: download both media inputs, sync, and publish
    pub async fn run_lip_sync(&self, request: LipSyncRequest) -> Result<LipSyncResult> {
        let video_url = required(&request.tiktok_url, "tiktokUrl")?;
        let audio_url = required(&request.audio_url, "audioUrl")?;

        let video_path = self.downloader.download(video_url).await?;
        let audio_path = self.store.materialize(audio_url).await?;

        let synced_url = self.lip_syncer.sync(&video_path, &audio_path).await?;
        let lipsynced_video_path = self.store.materialize(&synced_url).await?;

        let result = LipSyncResult {
            lipsynced_video_url: self.store.publish(&lipsynced_video_path)?,
            lipsynced_video_path,
        };

        info!("Lip-sync stage complete");
        Ok(result)
    }

    /// Run the full clip pipeline: download → face swap → video generation
    ///
    /// Stages execute strictly in dependency order; the first failure aborts
    /// the run.
    pub async fn run_clip(
        &self,
        source_url: &str,
        swap_image_url: &str,
        prompt: &str,
        provider: VideoProvider,
    ) -> Result<GenerateVideoResult> {
        let download = self
            .run_download(DownloadRequest {
                tiktok_url: source_url.to_string(),
            })
            .await?;

        let [frame0, frame5] = download.frames.as_slice() else {
            return Err(PipelineError::Validation(format!(
                "expected {} extracted frames, got {}",
                FRAME_TIME_POINTS.len(),
                download.frames.len()
            )));
        };

        let swap = self
            .run_face_swap(FaceSwapRequest {
                frame0_path: frame0.path.display().to_string(),
                frame5_path: frame5.path.display().to_string(),
                swap_image_url: swap_image_url.to_string(),
            })
            .await?;

        self.run_generate_video(GenerateVideoRequest {
            first_frame_url: swap.swapped_frame0_url,
            last_frame_url: swap.swapped_frame5_url,
            prompt: prompt.to_string(),
            provider,
        })
        .await
    }

    pub fn store(&self) -> &Arc<ArtifactStore> {
        &self.store
    }

    fn generator(&self, choice: VideoProvider) -> &Arc<dyn VideoGenerator> {
        match choice {
            VideoProvider::Kling => &self.kling,
            VideoProvider::Luma => &self.luma,
        }
    }
}

fn frame_label(timestamp: f64) -> String {
    if timestamp == 0.0 {
        "start frame".to_string()
    } else {
        format!("{timestamp}-second frame")
    }
}

fn required<'a>(value: &'a str, field: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PipelineError::Validation(format!("{field} is required")));
    }
    Ok(trimmed)
}

fn existing_file(value: &str) -> Result<PathBuf> {
    let path = Path::new(value);
    if !path.is_file() {
        return Err(PipelineError::Validation(format!(
            "file does not exist: {value}"
        )));
    }
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct FailingSwapper;

    #[async_trait]
    impl FaceSwapper for FailingSwapper {
        async fn swap(&self, _target_image: &Path, _swap_image_url: &str) -> Result<String> {
            Err(PipelineError::TaskFailed("face not detected".to_string()))
        }
    }

    struct RecordingGenerator {
        calls: AtomicUsize,
    }

    impl RecordingGenerator {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl VideoGenerator for RecordingGenerator {
        async fn generate(
            &self,
            _first_frame_url: &str,
            _last_frame_url: &str,
            _prompt: &str,
        ) -> Result<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![])
        }
    }

    struct UnusedSyncer;

    #[async_trait]
    impl LipSyncer for UnusedSyncer {
        async fn sync(&self, _video: &Path, _audio: &Path) -> Result<String> {
            unreachable!("lip sync is not part of these tests")
        }
    }

    fn runner_with(
        dir: &TempDir,
        swapper: Arc<dyn FaceSwapper>,
        generator: Arc<RecordingGenerator>,
    ) -> PipelineRunner {
        let store = Arc::new(
            ArtifactStore::new(dir.path().join("tmp"), dir.path().join("public"), "/temp").unwrap(),
        );
        PipelineRunner::new(
            store,
            swapper,
            generator.clone(),
            generator,
            Arc::new(UnusedSyncer),
        )
    }

    #[test]
    fn test_frame_labels() {
        assert_eq!(frame_label(0.0), "start frame");
        assert_eq!(frame_label(5.0), "5-second frame");
    }

    #[tokio::test]
    async fn test_blank_download_url_is_a_validation_error() {
        let dir = TempDir::new().unwrap();
        let generator = Arc::new(RecordingGenerator::new());
        let runner = runner_with(&dir, Arc::new(FailingSwapper), generator);

        let err = runner
            .run_download(DownloadRequest {
                tiktok_url: "  ".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }

    #[tokio::test]
    async fn test_face_swap_failure_aborts_before_video_generation() {
        let dir = TempDir::new().unwrap();
        let frame0 = dir.path().join("frame0.jpg");
        let frame5 = dir.path().join("frame5.jpg");
        std::fs::write(&frame0, b"jpg").unwrap();
        std::fs::write(&frame5, b"jpg").unwrap();

        let generator = Arc::new(RecordingGenerator::new());
        let runner = runner_with(&dir, Arc::new(FailingSwapper), generator.clone());

        // Caller-composed chain: face swap first, generation only on success
        let err = runner
            .run_face_swap(FaceSwapRequest {
                frame0_path: frame0.display().to_string(),
                frame5_path: frame5.display().to_string(),
                swap_image_url: "https://cdn.example/face.jpg".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::TaskFailed(_)));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_run_clip_aborts_on_invalid_source_without_calling_providers() {
        let dir = TempDir::new().unwrap();
        let generator = Arc::new(RecordingGenerator::new());
        let runner = runner_with(&dir, Arc::new(FailingSwapper), generator.clone());

        let err = runner
            .run_clip("not-a-url", "https://cdn.example/face.jpg", "p", VideoProvider::Kling)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Validation(_)));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_face_swap_requires_existing_frames() {
        let dir = TempDir::new().unwrap();
        let generator = Arc::new(RecordingGenerator::new());
        let runner = runner_with(&dir, Arc::new(FailingSwapper), generator);

        let err = runner
            .run_face_swap(FaceSwapRequest {
                frame0_path: "/no/such/frame.jpg".to_string(),
                frame5_path: "/no/such/frame5.jpg".to_string(),
                swap_image_url: "https://cdn.example/face.jpg".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }

    #[tokio::test]
    async fn test_generate_video_requires_prompt() {
        let dir = TempDir::new().unwrap();
        let generator = Arc::new(RecordingGenerator::new());
        let runner = runner_with(&dir, Arc::new(FailingSwapper), generator.clone());

        let err = runner
            .run_generate_video(GenerateVideoRequest {
                first_frame_url: "https://a/0.jpg".to_string(),
                last_frame_url: "https://a/5.jpg".to_string(),
                prompt: String::new(),
                provider: VideoProvider::Kling,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Validation(_)));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }
}
