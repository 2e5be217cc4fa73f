// Google Drive & Sheets Gateway
//
// Standalone OAuth relay between chat plugin hosts and Google's APIs.
// Configuration comes from the environment, optionally seeded from `.env`.

use google_gateway::{start_server, GatewayConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(anyhow::anyhow!("Failed to load .env file: {}", e));
        }
    }

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = GatewayConfig::from_env()?;

    tracing::info!("[INFO] Starting Google gateway on {}:{}", config.host, config.port);
    tracing::info!("[INFO] Public base URL: {}", config.public_base_url);

    start_server(config).await?;

    Ok(())
}
