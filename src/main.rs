use clap::Parser;
use postcraft_api::cli::{self, Cli};
use postcraft_api::{config, is_production};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::config().clone();
    tracing::info!("Starting Postcraft API in {:?} mode", config.environment);

    if is_production!() && config.security.jwt_secret.trim().is_empty() {
        anyhow::bail!("JWT_SECRET must be set in production");
    }

    let cli = Cli::parse();
    cli::run(cli, config).await
}
