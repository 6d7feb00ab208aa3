//! # Maintenance Gate
//!
//! Per-request decision: serve the live site or the maintenance page.
//!
//! The decision itself ([`evaluate`]) is a pure function over the flag, the
//! bypass settings and a few facts about the request. [`Gate`] wraps it with
//! the injected [`ConfigProvider`] that supplies the flag.

use crate::identity::{Identity, identity_of};
use crate::render::is_internal_render;
use http::Request;
use quiesce_core::{ConfigProvider, GateConfig};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassReason {
    MaintenanceOff,
    /// The flag could not be read; the gate fails open.
    ConfigUnavailable,
    Administrator,
    BypassPrefix,
    /// The request is the builder rendering the error page itself.
    InternalRender,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Pass(PassReason),
    Block,
}

impl GateDecision {
    pub fn is_pass(&self) -> bool {
        matches!(self, GateDecision::Pass(_))
    }
}

/// Path prefixes exempt from gating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateSettings {
    bypass_prefixes: Vec<String>,
}

impl GateSettings {
    pub fn new(prefixes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let bypass_prefixes = prefixes
            .into_iter()
            .map(Into::into)
            .map(|p: String| p.trim_end_matches('/').to_string())
            .filter(|p| !p.is_empty())
            .collect();
        Self { bypass_prefixes }
    }

    /// Admin, build and auth prefixes followed by any extra `bypass_prefixes`.
    pub fn from_config(config: &GateConfig) -> Self {
        Self::new(
            [
                config.admin_prefix.as_str(),
                config.build_prefix.as_str(),
                config.auth_prefix.as_str(),
            ]
            .into_iter()
            .chain(config.bypass_prefixes.iter().map(String::as_str)),
        )
    }

    pub fn prefixes(&self) -> &[String] {
        &self.bypass_prefixes
    }

    pub fn is_bypassed(&self, path: &str) -> bool {
        self.bypass_prefixes
            .iter()
            .any(|prefix| path_has_prefix(path, prefix))
    }
}

impl Default for GateSettings {
    fn default() -> Self {
        Self::from_config(&GateConfig::default())
    }
}

/// Segment-aware prefix match: `/admin` covers `/admin` and `/admin/pages`, not `/administer`.
fn path_has_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// What the gate needs to know about a request, detached from its body.
#[derive(Debug, Clone, Default)]
pub struct RequestFacts {
    pub path: String,
    pub identity: Option<Identity>,
    pub internal_render: bool,
}

impl RequestFacts {
    pub fn from_request<B>(req: &Request<B>) -> Self {
        Self {
            path: req.uri().path().to_string(),
            identity: identity_of(req).cloned(),
            internal_render: is_internal_render(req),
        }
    }

    pub fn anonymous(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }
}

pub fn evaluate(under_maintenance: bool, settings: &GateSettings, facts: &RequestFacts) -> GateDecision {
    if !under_maintenance {
        return GateDecision::Pass(PassReason::MaintenanceOff);
    }
    if facts.identity.as_ref().is_some_and(Identity::is_admin) {
        return GateDecision::Pass(PassReason::Administrator);
    }
    if settings.is_bypassed(&facts.path) {
        return GateDecision::Pass(PassReason::BypassPrefix);
    }
    if facts.internal_render {
        return GateDecision::Pass(PassReason::InternalRender);
    }
    GateDecision::Block
}

#[derive(Clone)]
pub struct Gate {
    provider: Arc<dyn ConfigProvider>,
    settings: Arc<GateSettings>,
}

impl Gate {
    pub fn new(provider: Arc<dyn ConfigProvider>, settings: GateSettings) -> Self {
        Self {
            provider,
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &GateSettings {
        &self.settings
    }

    /// Reads the flag once and evaluates `facts` against it.
    pub async fn evaluate(&self, facts: &RequestFacts) -> GateDecision {
        match self.provider.site_config().await {
            Ok(site) => evaluate(site.under_maintenance, &self.settings, facts),
            Err(e) => {
                tracing::warn!(error = %e, "Site config unavailable, gate failing open");
                GateDecision::Pass(PassReason::ConfigUnavailable)
            }
        }
    }
}
