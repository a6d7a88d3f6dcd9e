use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use brainrot_narrator::api::edge_tts::EdgeTtsClient;
use brainrot_narrator::api::gemini::GeminiClient;
use brainrot_narrator::config::Config;
use brainrot_narrator::routes::{AppState, router};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    let gemini = GeminiClient::new(&config.gemini_api_key)?;

    let state = AppState {
        gemini: Arc::new(gemini),
        tts: Arc::new(EdgeTtsClient::new()),
    };
    let app = router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("listening on {addr}");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
