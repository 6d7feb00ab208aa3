//! Maintenance flag commands
//!
//! `quiesce enable|disable` edit `[site] under_maintenance` in place;
//! `quiesce status` reports it together with the cached page.

use anyhow::{Context, Result};
use quiesce_core::{MAINTENANCE_STATUS, QuiesceConfig, error_page_filepath};
use std::path::Path;

pub fn run_set_maintenance(config_path: &Path, enabled: bool) -> Result<()> {
    set_maintenance(config_path, enabled)?;

    if enabled {
        println!("Maintenance mode enabled ({})", config_path.display());
        let config = crate::load_config(config_path)?;
        let artifact = error_page_filepath(&config.paths.assets_dir, MAINTENANCE_STATUS);
        if !artifact.exists() {
            println!("  Warning: {} does not exist yet, run `quiesce build`", artifact.display());
        }
    } else {
        println!("Maintenance mode disabled ({})", config_path.display());
    }
    Ok(())
}

/// Rewrites the flag without touching the other (unrooted) settings.
fn set_maintenance(config_path: &Path, enabled: bool) -> Result<()> {
    let mut config = QuiesceConfig::load_or_default(config_path)
        .with_context(|| format!("Failed to load config: {}", config_path.display()))?;
    config.site.under_maintenance = enabled;
    config
        .save(config_path)
        .with_context(|| format!("Failed to save config: {}", config_path.display()))
}

pub fn run_status(config_path: &Path) -> Result<()> {
    let config = crate::load_config(config_path)?;
    let artifact = error_page_filepath(&config.paths.assets_dir, MAINTENANCE_STATUS);

    println!(
        "Maintenance mode: {}",
        if config.site.under_maintenance { "ON" } else { "off" }
    );
    println!(
        "Cached page:      {} ({})",
        artifact.display(),
        if artifact.exists() { "present" } else { "missing" }
    );
    println!("Content store:    {}", config.paths.content_store.display());
    println!("Bypass prefixes:  {}", {
        let gate = &config.gate;
        let mut prefixes = vec![
            gate.admin_prefix.as_str(),
            gate.build_prefix.as_str(),
            gate.auth_prefix.as_str(),
        ];
        prefixes.extend(gate.bypass_prefixes.iter().map(String::as_str));
        prefixes.join(", ")
    });
    Ok(())
}
