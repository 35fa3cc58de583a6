//! HTTP request handlers

use axum::extract::{Multipart, State};
use axum::response::IntoResponse;
use axum::Json;
use tracing::{error, info};
use ugc_common::PipelineError;
use ugc_orchestrator::{DownloadRequest, FaceSwapRequest, GenerateVideoRequest, LipSyncRequest};

use crate::types::{ApiError, HealthResponse, UploadResponse};
use crate::ApiState;

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Download stage: fetch a source video and extract its key frames
pub async fn download(
    State(state): State<ApiState>,
    Json(request): Json<DownloadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Download request for {}", request.tiktok_url);
    let result = state.runner.run_download(request).await.inspect_err(log_stage_error)?;
    Ok(Json(result))
}

/// Face-swap stage: swap a face onto both extracted frames
pub async fn face_swap(
    State(state): State<ApiState>,
    Json(request): Json<FaceSwapRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Face-swap request with swap image {}", request.swap_image_url);
    let result = state.runner.run_face_swap(request).await.inspect_err(log_stage_error)?;
    Ok(Json(result))
}

/// Video-generation stage: produce three candidate variants
pub async fn generate_video(
    State(state): State<ApiState>,
    Json(request): Json<GenerateVideoRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Video-generation request via {}", request.provider);
    let result = state
        .runner
        .run_generate_video(request)
        .await
        .inspect_err(log_stage_error)?;
    Ok(Json(result))
}

/// Lip-sync stage: sync a downloaded video to an audio track
pub async fn lip_sync(
    State(state): State<ApiState>,
    Json(request): Json<LipSyncRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Lip-sync request for {}", request.tiktok_url);
    let result = state.runner.run_lip_sync(request).await.inspect_err(log_stage_error)?;
    Ok(Json(result))
}

/// Persist an uploaded file and mint its public URL
pub async fn upload(
    State(state): State<ApiState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        ApiError(PipelineError::Validation(format!("malformed multipart body: {e}")))
    })? {
        if field.name() != Some("file") {
            continue;
        }

        let original_name = field.file_name().unwrap_or("upload.jpg").to_string();
        let bytes = field.bytes().await.map_err(|e| {
            ApiError(PipelineError::Validation(format!("failed to read upload: {e}")))
        })?;

        let store = state.runner.store();
        let file_path = store.store_upload(&original_name, &bytes).await?;
        let file_url = store.publish(&file_path)?;

        info!("Stored upload {} as {}", original_name, file_path.display());
        return Ok(Json(UploadResponse { file_path, file_url }));
    }

    Err(ApiError(PipelineError::Validation(
        "no file provided".to_string(),
    )))
}

fn log_stage_error(err: &PipelineError) {
    error!("Stage failed: {}", err);
}
