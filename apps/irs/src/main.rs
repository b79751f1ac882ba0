use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use irs::config::{Config, DataSourceKind};
use irs::data_sources::{
    Collections, DataSource, InMemoryDataSource, PostgresDataSource, RemoteDataSource,
};
use irs::db::create_pool;
use irs::endpoint::assemble_endpoint_config;
use irs::llm_client::{LlmClient, DEFAULT_MODEL};
use irs::server::{run_server, ServerContext};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting IRS v{}", env!("CARGO_PKG_VERSION"));

    let source = build_data_source(&config).await?;
    info!("Data source: {}", source.kind());

    let endpoint = assemble_endpoint_config(&config.endpoint, source.as_ref()).await?;

    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!(
        "LLM client initialized (model: {})",
        endpoint
            .model
            .as_ref()
            .map_or(DEFAULT_MODEL, |m| m.name.as_str())
    );

    let context = ServerContext::new(Arc::new(llm), config.port);
    run_server(context, vec![endpoint]).await
}

async fn build_data_source(config: &Config) -> Result<Box<dyn DataSource>> {
    let source: Box<dyn DataSource> = match &config.data_source {
        DataSourceKind::Memory { fixtures_dir } => Box::new(InMemoryDataSource::from_dir(
            config.irs_id.clone(),
            fixtures_dir,
        )?),
        DataSourceKind::Postgres { database_url } => {
            let pool = create_pool(database_url).await?;
            Box::new(PostgresDataSource::new(
                pool,
                config.irs_id.clone(),
                Collections::default(),
            ))
        }
        DataSourceKind::Remote { base_url } => {
            Box::new(RemoteDataSource::new(base_url, config.irs_id.clone())?)
        }
    };
    Ok(source)
}
