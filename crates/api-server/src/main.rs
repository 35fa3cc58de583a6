//! API Server Binary Entry Point

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use ugc_api_server::{start_server, ApiState};
use ugc_common::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ugc_api_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env().context("failed to load settings")?;
    let state = ApiState::from_settings(&settings).context("failed to wire pipeline")?;

    let addr = std::env::var("API_SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    tracing::info!("Starting UGC pipeline API server");
    start_server(&addr, state).await?;

    Ok(())
}
