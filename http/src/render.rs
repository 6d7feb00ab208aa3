//! # Internal render requests
//!
//! The cache builder needs the error page exactly as a visitor would see it,
//! so [`ServiceRenderer`] sends an internal GET through the same service stack
//! that serves real traffic. The request carries a [`RenderMarker`] extension,
//! which the gate lets through even while maintenance mode is on. Extensions
//! never travel over the wire, so clients cannot forge the marker.

use async_trait::async_trait;
use bytes::Bytes;
use http::{Method, Request, Response};
use http_body_util::{BodyExt, Full};
use quiesce_core::{ErrorPage, PageRenderer, RenderError};
use std::fmt::Display;
use tower::{Service, ServiceExt};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderMarker;

pub fn is_internal_render<B>(req: &Request<B>) -> bool {
    req.extensions().get::<RenderMarker>().is_some()
}

#[derive(Clone)]
pub struct ServiceRenderer<S> {
    service: S,
}

impl<S> ServiceRenderer<S>
where
    S: Service<Request<Full<Bytes>>, Response = Response<Full<Bytes>>> + Clone + Send + Sync + 'static,
    S::Future: Send,
    S::Error: Display,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }

    /// Issue an internal GET for `path` and return the response body.
    pub async fn render_path(&self, path: &str) -> Result<String, RenderError> {
        let mut req = Request::builder()
            .method(Method::GET)
            .uri(path)
            .body(Full::new(Bytes::new()))
            .map_err(|e| RenderError::Pipeline(e.to_string()))?;
        req.extensions_mut().insert(RenderMarker);

        let res = self
            .service
            .clone()
            .oneshot(req)
            .await
            .map_err(|e| RenderError::Pipeline(e.to_string()))?;

        if !res.status().is_success() {
            return Err(RenderError::Status {
                path: path.to_string(),
                status: res.status().as_u16(),
            });
        }

        let body = match res.into_body().collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(never) => match never {},
        };
        String::from_utf8(body.to_vec()).map_err(|_| RenderError::Encoding {
            path: path.to_string(),
        })
    }
}

#[async_trait]
impl<S> PageRenderer for ServiceRenderer<S>
where
    S: Service<Request<Full<Bytes>>, Response = Response<Full<Bytes>>> + Clone + Send + Sync + 'static,
    S::Future: Send,
    S::Error: Display,
{
    async fn render(&self, page: &ErrorPage) -> Result<String, RenderError> {
        tracing::debug!(link = %page.link(), "Rendering error page through the service stack");
        self.render_path(&page.link()).await
    }
}
