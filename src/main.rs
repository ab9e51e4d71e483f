use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{fmt, EnvFilter};

use interface_zero::config::AppConfig;
use interface_zero::gemini::GeminiClient;
use interface_zero::routes::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = AppConfig::from_env();
    tracing::info!(
        "Using API key: {}...",
        config.api_key.chars().take(10).collect::<String>()
    );
    if config.is_demo() {
        tracing::info!("🧪 No GEMINI_API_KEY set; replies are synthesized offline");
    }
    tracing::info!(
        model = %config.model,
        step_budget = config.limits.step_budget,
        memory_mb = config.limits.memory_limit / (1024 * 1024),
        "Sandbox configured"
    );

    let addr = config.addr();
    let state = AppState::new(Arc::new(GeminiClient::from_config(&config)), config);
    let app = router(state);

    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("🛑 Shutting down");
    }
}
