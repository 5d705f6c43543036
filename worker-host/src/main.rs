use shared::config::Config;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env before the filter reads RUST_LOG
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match dotenv {
        Ok(_) => info!("Loaded environment variables from .env file"),
        Err(_) => info!("No .env file found, using system environment variables"),
    }

    let config = Config::from_env();
    info!("Starting offline cache worker for {}", config.script_url);

    let worker = worker_host::build_worker(&config)?;

    if let Err(e) = worker.start().await {
        error!("Worker did not start: {}", e);
        std::process::exit(1);
    }

    let cache = worker.cache().await?;
    for key in cache.keys().await? {
        info!("Cached {}", key);
    }

    Ok(())
}
