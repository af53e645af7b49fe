use anyhow::Context;
use market_listings_sdk::{api, AppConfig, MasterQueryPipeline};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "market_listings_sdk=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    tracing::info!(?config, "Configuration loaded");

    let pipeline =
        MasterQueryPipeline::from_config(&config).context("Failed to create CoinMarketCap provider")?;

    api::start_server(pipeline, &config.bind_addr()).await
}
