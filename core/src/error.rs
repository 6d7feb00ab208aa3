use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("No error page for status {code} on the {stage} stage")]
    NotFound { code: u16, stage: &'static str },
    #[error("Content store I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Content store is corrupt: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Render request for {path} returned status {status}")]
    Status { path: String, status: u16 },
    #[error("Rendered body for {path} is not valid UTF-8")]
    Encoding { path: String },
    #[error("Render pipeline failed: {0}")]
    Pipeline(String),
}
