//! # Quiesce Status
//!
//! Static error page cache. The [`CacheBuilder`] makes sure the maintenance
//! `ErrorPage` exists and that its rendered HTML sits at a fixed path under the
//! assets directory, where the gate (or a front-end proxy) can serve it
//! without rendering anything.
//!
//! ## Key pieces
//!
//! - **CacheBuilder**: idempotent `ensure_cached()` run during bootstrap
//! - **TemplateRenderer**: renders a page into the default HTML shell
//! - **error-503.html**: the cached artifact itself

pub mod builder;
pub mod renderer;
mod templates;

pub use builder::{CacheBuilder, CacheReport, DEFAULT_CONTENT, DEFAULT_TITLE};
pub use renderer::TemplateRenderer;
