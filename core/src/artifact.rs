//! On-disk location of cached error pages.
//!
//! The path is a pure function of the assets root and the status code, so a
//! front-end proxy can serve the file without going through Quiesce at all.

use std::io;
use std::path::{Path, PathBuf};

/// Status code of the maintenance page.
pub const MAINTENANCE_STATUS: u16 = 503;

/// Served when the cached artifact cannot be read at block time.
pub const FALLBACK_BODY: &str = "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>Service Unavailable</title></head>\n<body><h1>Service Unavailable</h1><p>This site is undergoing scheduled maintenance. Please check back shortly.</p></body></html>\n";

pub fn error_page_filepath(assets_dir: &Path, code: u16) -> PathBuf {
    assets_dir.join(format!("error-{code}.html"))
}

/// Creates the assets directory if missing. A concurrent creator winning the race is not an error.
pub async fn ensure_assets_dir(assets_dir: &Path) -> io::Result<()> {
    match tokio::fs::create_dir_all(assets_dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            match tokio::fs::metadata(assets_dir).await {
                Ok(meta) if meta.is_dir() => Ok(()),
                _ => Err(e),
            }
        }
        Err(e) => Err(e),
    }
}
