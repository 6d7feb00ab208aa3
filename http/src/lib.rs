//! # Quiesce HTTP
//!
//! Maintenance mode as Tower middleware.
//!
//! ```rust,ignore
//! let svc = ServiceBuilder::new()
//!     .layer(IdentityLayer::from_config(&config.gate))
//!     .layer(MaintenanceLayer::from_config(provider, &config))
//!     .service(SiteService::new(store, &config.paths.public_dir));
//! ```
//!
//! Requests flow `IdentityLayer → MaintenanceLayer → site`. While the site is
//! under maintenance, anything the gate does not let through is answered with
//! the cached 503 page and never reaches the site.

pub mod gate;
pub mod identity;
pub mod layer;
pub mod render;
pub mod response;
pub mod server;
pub mod site;

pub use gate::{Gate, GateDecision, GateSettings, PassReason, RequestFacts, evaluate};
pub use identity::{ADMIN_PERMISSION, Identity, IdentityLayer, IdentityService};
pub use layer::{MaintenanceLayer, MaintenanceService};
pub use render::{RenderMarker, ServiceRenderer, is_internal_render};
pub use server::{ServeError, parse_addr, serve, serve_listener};
pub use site::SiteService;

pub mod prelude {
    pub use crate::gate::{Gate, GateDecision, GateSettings};
    pub use crate::identity::{Identity, IdentityLayer};
    pub use crate::layer::MaintenanceLayer;
    pub use crate::render::ServiceRenderer;
    pub use crate::site::SiteService;

    // Re-export common types users will need
    pub use bytes::Bytes;
    pub use http::{Request, Response, StatusCode};
    pub use http_body_util::Full;
}
