//! Outreach delivery worker entry point.

use std::sync::Arc;

use dripline::config::Config;
use dripline::email::{TransportRegistry, DEFAULT_ACCOUNT};
use dripline::outreach::OutreachRuntime;
use dripline::store::PgStore;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    info!("starting dripline worker");

    let config = Config::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("database ready");

    let registry = Arc::new(TransportRegistry::from_providers(config.providers.clone()));
    if !registry.has_account(DEFAULT_ACCOUNT) {
        warn!("no default email provider configured; sends from unknown accounts will fail");
    }

    let runtime = OutreachRuntime::start(Arc::new(PgStore::new(pool)), registry, &config.worker);

    info!("outreach runtime started; waiting for shutdown signal");
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    runtime.shutdown().await;

    Ok(())
}
