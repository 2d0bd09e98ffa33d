use std::sync::Arc;

use anyhow::Context;

use taskdesk_api::app::{build_app, build_services};
use taskdesk_api::config::AppConfig;
use taskdesk_api::seed::seed_admin;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; real deployments set the environment directly.
    let _ = dotenvy::dotenv();
    taskdesk_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::debug!(?config, "configuration loaded");

    let services = build_services(&config).await.context("service bootstrap failed")?;
    seed_admin(&services.credentials, config.seed_admin.as_ref())
        .await
        .context("admin seeding failed")?;

    let app = build_app(Arc::new(services));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
