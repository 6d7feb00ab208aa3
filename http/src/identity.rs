//! # Identity
//!
//! Who is making the request. The gate reads an [`Identity`] from the request
//! extensions; [`IdentityLayer`] is the stock way to put one there, resolving
//! `Authorization: Bearer <token>` against the configured admin tokens.

use http::Request;
use http::header::AUTHORIZATION;
use quiesce_core::GateConfig;
use std::collections::HashMap;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

pub const ADMIN_PERMISSION: &str = "ADMIN";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub permissions: Vec<String>,
}

impl Identity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            permissions: Vec::new(),
        }
    }

    pub fn admin(name: impl Into<String>) -> Self {
        Self::new(name).with_permission(ADMIN_PERMISSION)
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.push(permission.into());
        self
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    pub fn is_admin(&self) -> bool {
        self.has_permission(ADMIN_PERMISSION)
    }
}

/// Identity attached to `req`, if any.
pub fn identity_of<B>(req: &Request<B>) -> Option<&Identity> {
    req.extensions().get::<Identity>()
}

#[derive(Clone, Debug, Default)]
pub struct IdentityLayer {
    // token -> identity name
    admin_tokens: Arc<HashMap<String, String>>,
}

impl IdentityLayer {
    /// `admin_tokens` yields `(name, token)` pairs. Empty tokens are ignored.
    pub fn new(
        admin_tokens: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        let admin_tokens = admin_tokens
            .into_iter()
            .map(|(name, token)| -> (String, String) { (token.into(), name.into()) })
            .filter(|(token, _)| !token.is_empty())
            .collect();
        Self {
            admin_tokens: Arc::new(admin_tokens),
        }
    }

    pub fn from_config(config: &GateConfig) -> Self {
        Self::new(&config.admin_tokens)
    }
}

impl<S> Layer<S> for IdentityLayer {
    type Service = IdentityService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        IdentityService {
            inner,
            admin_tokens: self.admin_tokens.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct IdentityService<S> {
    inner: S,
    admin_tokens: Arc<HashMap<String, String>>,
}

impl<S> IdentityService<S> {
    fn resolve<B>(&self, req: &Request<B>) -> Option<Identity> {
        let header = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
        let token = header.strip_prefix("Bearer ")?.trim();
        self.admin_tokens.get(token).map(Identity::admin)
    }
}

impl<S, B> Service<Request<B>> for IdentityService<S>
where
    S: Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        // An identity set by an earlier auth layer wins.
        if identity_of(&req).is_some() {
            return self.inner.call(req);
        }
        if let Some(identity) = self.resolve(&req) {
            tracing::debug!(identity = %identity.name, "Resolved request identity");
            req.extensions_mut().insert(identity);
        }
        self.inner.call(req)
    }
}
