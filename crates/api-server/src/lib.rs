//! REST API server for the UGC media pipeline
//!
//! One POST endpoint per pipeline stage, a multipart upload endpoint, and
//! static serving of the published-artifact directory. Handlers are thin:
//! they parse the stage request, call the pipeline runner, and map failures
//! to `{error}` responses.

mod handlers;
mod types;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use ugc_artifact_store::ArtifactStore;
use ugc_common::{Result, Settings};
use ugc_orchestrator::PipelineRunner;
use ugc_providers::{
    piapi_client, syncio_client, video_generation_poller, KlingVideoGen, LumaVideoGen,
    PiapiFaceSwap, SyncioLipSync,
};
use ugc_remote_task::TaskApi;

pub use handlers::*;
pub use types::*;

/// API server state shared across handlers
#[derive(Clone)]
pub struct ApiState {
    pub runner: Arc<PipelineRunner>,
    /// Public directory served under the public base path
    pub public_dir: std::path::PathBuf,
}

impl ApiState {
    /// Wire the full pipeline from settings
    ///
    /// # Errors
    /// Returns `Config`/`Io` if a client or the artifact store cannot be
    /// built.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let store = Arc::new(ArtifactStore::new(
            settings.temp_dir.clone(),
            settings.public_dir.clone(),
            settings.public_base.clone(),
        )?);

        let piapi: Arc<dyn TaskApi> = Arc::new(piapi_client(&settings.piapi)?);
        let syncio: Arc<dyn TaskApi> = Arc::new(syncio_client(&settings.syncio)?);

        let face_swapper = Arc::new(PiapiFaceSwap::new(
            piapi.clone(),
            PiapiFaceSwap::default_poller(),
            store.clone(),
            settings.piapi_storage_prefix.clone(),
        ));
        let kling = Arc::new(KlingVideoGen::new(piapi.clone(), video_generation_poller()));
        let luma = Arc::new(LumaVideoGen::new(piapi, video_generation_poller()));
        let lip_syncer = Arc::new(SyncioLipSync::new(syncio, SyncioLipSync::default_poller()));

        let runner = Arc::new(PipelineRunner::new(
            store,
            face_swapper,
            kling,
            luma,
            lip_syncer,
        ));

        Ok(Self {
            runner,
            public_dir: settings.public_dir.clone(),
        })
    }
}

/// Build the API router with all endpoints
pub fn build_router(state: ApiState) -> Router {
    let public_dir = state.public_dir.clone();
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Pipeline stages
        .route("/api/v1/download", post(download))
        .route("/api/v1/faceswap", post(face_swap))
        .route("/api/v1/generate", post(generate_video))
        .route("/api/v1/lipsync", post(lip_sync))
        // Direct artifact upload
        .route("/api/v1/upload", post(upload))
        // Published artifacts
        .nest_service("/temp", ServeDir::new(public_dir))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the API server
///
/// # Errors
/// Returns an IO error if the listener cannot bind or the server fails.
pub async fn start_server(addr: &str, state: ApiState) -> std::io::Result<()> {
    tracing::info!("Starting API server on {}", addr);

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await
}
