use std::sync::Arc;

use anyhow::Context;
use rfpflow_config::Config;
use rfpflow_llm::HttpBackendFactory;
use rfpflow_utils::ExitCode;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::report_error;
use crate::app::{build_router, open_store};

pub(in crate::cli) async fn execute(config: Config) -> Result<(), ExitCode> {
    let store = open_store(&config).map_err(|e| {
        report_error(&anyhow::Error::new(e), "storage");
        ExitCode::STORAGE
    })?;

    if store.selected_provider().is_none() {
        warn!("No AI provider selected; stage triggers fail until an admin selects one");
    }

    let factory = HttpBackendFactory::new(config.llm.clone()).map_err(|e| {
        report_error(&anyhow::Error::new(e), "llm");
        ExitCode::INTERNAL
    })?;

    let router = build_router(&config, store, Arc::new(factory));

    let listener = TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("cannot bind {}", config.server.bind))
        .map_err(|e| {
            report_error(&e, "serve");
            ExitCode::BIND_FAILED
        })?;
    info!(
        bind = %config.server.bind,
        upload_dir = %config.storage.upload_dir.display(),
        "rfpflow listening"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server terminated")
        .map_err(|e| {
            report_error(&e, "serve");
            ExitCode::INTERNAL
        })?;

    info!("rfpflow stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
