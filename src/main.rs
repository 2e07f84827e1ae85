use anyhow::{Context, Result};
use chat_context::config::AppConfig;
use chat_context::observability::init_tracing;
use chat_context::server::build_app;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config_path =
        std::env::var("CHAT_CONTEXT_CONFIG").unwrap_or_else(|_| "config/default".to_string());
    let config = AppConfig::load(Some(&config_path)).context("failed to load configuration")?;

    init_tracing(&config.logging)?;
    info!("Starting chat-context {}", env!("CARGO_PKG_VERSION"));

    let app = build_app(&config)?;

    let address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;
    info!("Listening on {}", address);

    axum::serve(listener, app).await?;
    Ok(())
}
