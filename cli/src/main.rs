//! Quiesce CLI - maintenance mode for a site
//!
//! # Commands
//! - `quiesce build` - Bootstrap step: make sure the 503 page exists and is cached
//! - `quiesce serve` - Serve the site behind the maintenance gate
//! - `quiesce enable` / `quiesce disable` - Flip the maintenance flag
//! - `quiesce status` - Show the flag and the cached page

mod build;
mod serve;
mod toggle;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use quiesce_core::QuiesceConfig;
use quiesce_core::config::CONFIG_ENV;
use std::path::{Path, PathBuf};

/// Quiesce maintenance mode CLI
#[derive(Parser)]
#[command(name = "quiesce")]
#[command(author, version, about = "Put a site into maintenance mode with a cached 503 page")]
struct Cli {
    /// Config file (default: $QUIESCE_CONFIG, then ./quiesce.toml)
    #[arg(short, long, global = true, env = CONFIG_ENV)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the maintenance error page if needed and cache its HTML
    Build,

    /// Serve the site behind the maintenance gate
    Serve {
        /// Address to listen on (default: [server] addr from the config)
        #[arg(short, long)]
        addr: Option<String>,
    },

    /// Turn maintenance mode on
    Enable,

    /// Turn maintenance mode off
    Disable,

    /// Show maintenance mode state
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    quiesce_core::telemetry::init_tracing();

    let cli = Cli::parse();
    let config_path = QuiesceConfig::resolve_path(cli.config.as_deref());

    match cli.command {
        Commands::Build => build::run_build(&config_path).await,
        Commands::Serve { addr } => serve::run_serve(&config_path, addr.as_deref()).await,
        Commands::Enable => toggle::run_set_maintenance(&config_path, true),
        Commands::Disable => toggle::run_set_maintenance(&config_path, false),
        Commands::Status => toggle::run_status(&config_path),
    }
}

/// Loads the config with its relative paths resolved against the config file's directory.
fn load_config(config_path: &Path) -> Result<QuiesceConfig> {
    let config = QuiesceConfig::load_or_default(config_path)
        .with_context(|| format!("Failed to load config: {}", config_path.display()))?;
    Ok(config.rooted_at(&config_dir(config_path)))
}

fn config_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
