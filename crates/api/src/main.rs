use std::sync::Arc;

use anyhow::Context;

use keygate_api::app::{build_app, services};
use keygate_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    keygate_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;

    let services = services::build_services(&config).await?;
    if let Some(bootstrap) = &config.bootstrap {
        services::bootstrap(&services, bootstrap).await?;
    }

    let app = build_app(Arc::new(services));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
