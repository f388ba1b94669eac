use market_intent_router::{api::start_server, config::Config, graph::DispatchGraph};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    if let Err(e) = config.validate() {
        eprintln!("⚠️  {}", e);
        eprintln!("📌 See .env.example for setup instructions");
        return Err(e.into());
    }

    info!("🚀 Market Intent Router - API Server");
    info!("📍 Port: {}", config.port);

    let graph = Arc::new(DispatchGraph::from_config(&config)?);

    info!("✅ Dispatch graph initialized");
    info!("📡 Starting API server...");

    start_server(graph, config.port).await?;

    Ok(())
}
