//! # Config: `quiesce.toml`
//!
//! The whole file is modelled by [`QuiesceConfig`]. The gate only ever needs
//! the `[site]` table, and it gets that through a [`ConfigProvider`] injected at
//! construction instead of a global singleton.

use crate::error::ConfigError;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment variable naming the config file when no explicit path is given.
pub const CONFIG_ENV: &str = "QUIESCE_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "quiesce.toml";

/// Site-wide settings owned by the admin surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Display the maintenance page to everyone but administrators.
    pub under_maintenance: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub assets_dir: PathBuf,
    pub content_store: PathBuf,
    pub public_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from("assets"),
            content_store: PathBuf::from("content.json"),
            public_dir: PathBuf::from("public"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub admin_prefix: String,
    pub build_prefix: String,
    pub auth_prefix: String,
    pub bypass_prefixes: Vec<String>,
    pub retry_after_secs: Option<u64>,
    /// Bearer tokens that grant administrator access, keyed by the name the
    /// resulting identity carries.
    pub admin_tokens: BTreeMap<String, String>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            admin_prefix: "/admin".to_string(),
            build_prefix: "/dev".to_string(),
            auth_prefix: "/Security".to_string(),
            bypass_prefixes: Vec::new(),
            retry_after_secs: None,
            admin_tokens: BTreeMap::new(),
        }
    }
}

/// How the cache builder decides an existing artifact is still current.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Invalidation {
    /// Regenerate only when the entity or the file is missing.
    #[default]
    Lazy,
    /// Also regenerate when the page title/content fingerprint changed.
    ContentHash,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub invalidation: Invalidation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuiesceConfig {
    pub site: SiteConfig,
    pub paths: PathsConfig,
    pub gate: GateConfig,
    pub cache: CacheConfig,
    pub server: ServerConfig,
}

impl QuiesceConfig {
    /// Picks the config file: explicit path, then `QUIESCE_CONFIG`, then `./quiesce.toml`.
    pub fn resolve_path(explicit: Option<&str>) -> PathBuf {
        explicit
            .map(PathBuf::from)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Like [`load`](Self::load) but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let raw = toml::to_string_pretty(self)?;
        std::fs::write(path, raw).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Re-roots the relative paths against `base` (usually the config file's directory).
    pub fn rooted_at(mut self, base: &Path) -> Self {
        let root = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        root(&mut self.paths.assets_dir);
        root(&mut self.paths.content_store);
        root(&mut self.paths.public_dir);
        self
    }
}

/// Source of the current [`SiteConfig`].
///
/// Called once per gated request. An `Err` means the configuration could not
/// be read; callers fail open.
#[async_trait]
pub trait ConfigProvider: Send + Sync + 'static {
    async fn site_config(&self) -> Result<SiteConfig, ConfigError>;
}

/// In-memory provider, mutable at runtime.
#[derive(Debug, Default)]
pub struct StaticConfigProvider {
    site: RwLock<SiteConfig>,
}

impl StaticConfigProvider {
    pub fn new(site: SiteConfig) -> Self {
        Self {
            site: RwLock::new(site),
        }
    }

    pub fn under_maintenance(enabled: bool) -> Self {
        Self::new(SiteConfig {
            under_maintenance: enabled,
        })
    }

    pub fn set_under_maintenance(&self, enabled: bool) {
        self.site.write().under_maintenance = enabled;
    }
}

#[async_trait]
impl ConfigProvider for StaticConfigProvider {
    async fn site_config(&self) -> Result<SiteConfig, ConfigError> {
        Ok(self.site.read().clone())
    }
}

/// Reads `[site]` from a TOML file on every call, so `quiesce enable` takes
/// effect on a running server without a restart.
#[derive(Debug, Clone)]
pub struct TomlConfigProvider {
    path: PathBuf,
}

impl TomlConfigProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ConfigProvider for TomlConfigProvider {
    async fn site_config(&self) -> Result<SiteConfig, ConfigError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| ConfigError::Read {
                path: self.path.clone(),
                source,
            })?;
        Ok(QuiesceConfig::from_toml_str(&raw)?.site)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_from_empty_file() {
        let config = QuiesceConfig::from_toml_str("").unwrap();
        assert!(!config.site.under_maintenance);
        assert_eq!(config.gate.admin_prefix, "/admin");
        assert_eq!(config.gate.auth_prefix, "/Security");
        assert_eq!(config.cache.invalidation, Invalidation::Lazy);
        assert_eq!(config.paths.assets_dir, PathBuf::from("assets"));
    }

    #[test]
    fn test_parse_partial_config() {
        let config = QuiesceConfig::from_toml_str(
            r#"
            [site]
            under_maintenance = true

            [gate]
            bypass_prefixes = ["/healthz"]
            retry_after_secs = 120

            [gate.admin_tokens]
            ops = "s3cret"

            [cache]
            invalidation = "content-hash"
            "#,
        )
        .unwrap();

        assert!(config.site.under_maintenance);
        assert_eq!(config.gate.bypass_prefixes, vec!["/healthz".to_string()]);
        assert_eq!(config.gate.retry_after_secs, Some(120));
        assert_eq!(config.gate.build_prefix, "/dev");
        assert_eq!(config.gate.admin_tokens.get("ops").map(String::as_str), Some("s3cret"));
        assert_eq!(config.cache.invalidation, Invalidation::ContentHash);
    }

    #[test]
    fn test_save_then_load_keeps_flag() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("quiesce.toml");

        let mut config = QuiesceConfig::default();
        config.site.under_maintenance = true;
        config.gate.retry_after_secs = Some(60);
        config
            .gate
            .admin_tokens
            .insert("ops".to_string(), "s3cret".to_string());
        config.save(&path).unwrap();

        let loaded = QuiesceConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_rooted_at_keeps_absolute_paths() {
        let mut config = QuiesceConfig::default();
        config.paths.public_dir = PathBuf::from("/srv/www");

        let rooted = config.rooted_at(Path::new("/etc/site"));
        assert_eq!(rooted.paths.assets_dir, PathBuf::from("/etc/site/assets"));
        assert_eq!(rooted.paths.public_dir, PathBuf::from("/srv/www"));
    }

    #[tokio::test]
    async fn test_toml_provider_reads_each_call() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("quiesce.toml");
        std::fs::write(&path, "[site]\nunder_maintenance = false\n").unwrap();

        let provider = TomlConfigProvider::new(&path);
        assert!(!provider.site_config().await.unwrap().under_maintenance);

        std::fs::write(&path, "[site]\nunder_maintenance = true\n").unwrap();
        assert!(provider.site_config().await.unwrap().under_maintenance);
    }

    #[tokio::test]
    async fn test_toml_provider_missing_file_is_error() {
        let dir = tempdir().unwrap();
        let provider = TomlConfigProvider::new(dir.path().join("absent.toml"));
        assert!(matches!(
            provider.site_config().await,
            Err(ConfigError::Read { .. })
        ));
    }
}
