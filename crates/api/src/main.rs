use std::sync::Arc;

use anyhow::Context;

use stockbook_api::app::{self, services::AppServices};
use stockbook_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;
    stockbook_observability::init(&config.tracing);

    let services = AppServices::from_config(&config)
        .await
        .context("failed to initialise ledger store")?;
    let app = app::build_app(Arc::new(services));

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        store = ?config.store,
        "listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
