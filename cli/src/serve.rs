//! Serve command

use anyhow::{Context, Result};
use quiesce_core::{
    ConfigProvider, JsonContentStore, MAINTENANCE_STATUS, TomlConfigProvider, error_page_filepath,
};
use quiesce_http::{IdentityLayer, MaintenanceLayer, SiteService, parse_addr, serve};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceBuilder;

pub async fn run_serve(config_path: &Path, addr: Option<&str>) -> Result<()> {
    let config = crate::load_config(config_path)?;

    if !config_path.exists() {
        tracing::warn!(
            path = %config_path.display(),
            "Config file missing; maintenance mode cannot be enabled until it exists"
        );
    }
    let artifact = error_page_filepath(&config.paths.assets_dir, MAINTENANCE_STATUS);
    if !artifact.exists() {
        tracing::warn!(
            path = %artifact.display(),
            "No cached maintenance page, run `quiesce build` first"
        );
    }

    // Re-read on every request so `quiesce enable` applies without a restart.
    let provider: Arc<dyn ConfigProvider> = Arc::new(TomlConfigProvider::new(config_path));
    let store = Arc::new(JsonContentStore::new(&config.paths.content_store));

    let svc = ServiceBuilder::new()
        .layer(IdentityLayer::from_config(&config.gate))
        .layer(MaintenanceLayer::from_config(provider, &config))
        .service(SiteService::new(store, &config.paths.public_dir));

    let addr = parse_addr(addr.unwrap_or(&config.server.addr))?;
    serve(addr, svc, shutdown_signal())
        .await
        .context("Server failed")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
