//! # Quiesce Core
//!
//! Protocol-agnostic building blocks shared by the maintenance gate and the
//! static page cache builder:
//!
//! - [`config`]: `quiesce.toml` model and the injected [`ConfigProvider`]
//! - [`content`]: the `ErrorPage` entity and its [`ContentStore`]
//! - [`artifact`]: deterministic on-disk location of a cached error page
//! - [`render`]: the [`PageRenderer`] seam used to turn a page into HTML

pub mod artifact;
pub mod config;
pub mod content;
pub mod error;
pub mod render;
pub mod telemetry;

pub use artifact::{FALLBACK_BODY, MAINTENANCE_STATUS, ensure_assets_dir, error_page_filepath};
pub use config::{
    CacheConfig, ConfigProvider, GateConfig, Invalidation, PathsConfig, QuiesceConfig,
    ServerConfig, SiteConfig, StaticConfigProvider, TomlConfigProvider,
};
pub use content::{
    ContentStore, ErrorPage, JsonContentStore, MemoryContentStore, Stage, error_page_link,
};
pub use error::{ConfigError, ContentError, RenderError};
pub use render::PageRenderer;

pub mod prelude {
    pub use crate::artifact::{MAINTENANCE_STATUS, error_page_filepath};
    pub use crate::config::{ConfigProvider, QuiesceConfig, SiteConfig};
    pub use crate::content::{ContentStore, ErrorPage, Stage};
    pub use crate::error::{ConfigError, ContentError, RenderError};
    pub use crate::render::PageRenderer;
}
