//! Bootstrap build command
//!
//! Runs the cache builder the way a schema migration step would: a page that
//! cannot be created or written is reported, never fatal.

use anyhow::Result;
use quiesce_core::{ContentStore, JsonContentStore, StaticConfigProvider};
use quiesce_http::{MaintenanceLayer, ServiceRenderer, SiteService};
use quiesce_status::CacheBuilder;
use std::path::Path;
use std::sync::Arc;
use tower::ServiceBuilder;

pub async fn run_build(config_path: &Path) -> Result<()> {
    let config = crate::load_config(config_path)?;

    println!("Building maintenance page cache...");
    println!("  Config: {}", config_path.display());
    println!("  Assets: {}", config.paths.assets_dir.display());

    let store: Arc<dyn ContentStore> = Arc::new(JsonContentStore::new(&config.paths.content_store));
    let provider = Arc::new(StaticConfigProvider::new(config.site.clone()));

    // Render through the same stack `serve` uses, gate included.
    let stack = ServiceBuilder::new()
        .layer(MaintenanceLayer::from_config(provider, &config))
        .service(SiteService::new(store.clone(), &config.paths.public_dir));

    let builder = CacheBuilder::new(
        store,
        Arc::new(ServiceRenderer::new(stack)),
        &config.paths.assets_dir,
    )
    .with_invalidation(config.cache.invalidation);

    let report = builder.ensure_cached().await;

    let message = report.message(builder.status_code());
    if report.is_failed() {
        eprintln!("\n✗ {}", message);
    } else {
        println!("\n✓ {}", message);
        println!("  Page: {}", report.path().display());
    }

    Ok(())
}
