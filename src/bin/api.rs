use life_insurance_advisor::{
    api::start_server,
    config::{AdvisorConfig, Credentials},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Loads .env as well
    let config = AdvisorConfig::from_env()?;

    let credentials = Credentials::from_env();
    if credentials.is_none() {
        warn!("OPENAI_API_KEY / FIRECRAWL_API_KEY / E2B_API_KEY not all set");
        warn!("/api/recommend will require keys in each request");
    }

    info!("🧠🛡️ Life Insurance Advisor - API Server");
    info!("📍 Port: {}", config.port);
    info!("🤖 Model: {}", config.model);

    start_server(config, credentials).await?;

    Ok(())
}
