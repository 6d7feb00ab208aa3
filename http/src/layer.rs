//! # MaintenanceLayer - Tower middleware
//!
//! Puts the [`Gate`] in front of any service that answers with
//! `Response<Full<Bytes>>`. Passed requests go to the inner service untouched;
//! blocked requests get the cached 503 page and the inner service is never
//! called.

use crate::gate::{Gate, GateDecision, GateSettings, RequestFacts};
use crate::response::{HttpResponse, service_unavailable};
use bytes::Bytes;
use http::{Request, Response};
use http_body_util::Full;
use quiesce_core::{
    ConfigProvider, FALLBACK_BODY, MAINTENANCE_STATUS, QuiesceConfig, error_page_filepath,
};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::Instrument;

#[derive(Clone)]
pub struct MaintenanceLayer {
    gate: Gate,
    artifact: Arc<PathBuf>,
    retry_after_secs: Option<u64>,
}

impl MaintenanceLayer {
    pub fn new(gate: Gate, artifact: impl Into<PathBuf>) -> Self {
        Self {
            gate,
            artifact: Arc::new(artifact.into()),
            retry_after_secs: None,
        }
    }

    /// Gate settings, artifact path and `Retry-After` taken from `config`.
    pub fn from_config(provider: Arc<dyn ConfigProvider>, config: &QuiesceConfig) -> Self {
        let gate = Gate::new(provider, GateSettings::from_config(&config.gate));
        Self::new(
            gate,
            error_page_filepath(&config.paths.assets_dir, MAINTENANCE_STATUS),
        )
        .with_retry_after(config.gate.retry_after_secs)
    }

    pub fn with_retry_after(mut self, secs: Option<u64>) -> Self {
        self.retry_after_secs = secs;
        self
    }

    pub fn artifact(&self) -> &Path {
        &self.artifact
    }
}

impl<S> Layer<S> for MaintenanceLayer {
    type Service = MaintenanceService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MaintenanceService {
            inner,
            gate: self.gate.clone(),
            artifact: self.artifact.clone(),
            retry_after_secs: self.retry_after_secs,
        }
    }
}

#[derive(Clone)]
pub struct MaintenanceService<S> {
    inner: S,
    gate: Gate,
    artifact: Arc<PathBuf>,
    retry_after_secs: Option<u64>,
}

impl<S, B> Service<Request<B>> for MaintenanceService<S>
where
    S: Service<Request<B>, Response = Response<Full<Bytes>>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = Response<Full<Bytes>>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        // Keep the service that was polled ready; leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let gate = self.gate.clone();
        let artifact = self.artifact.clone();
        let retry_after_secs = self.retry_after_secs;

        let facts = RequestFacts::from_request(&req);
        let request_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!(
            "HTTPRequest",
            quiesce.http.method = %req.method(),
            quiesce.http.path = %facts.path,
            quiesce.http.request_id = %request_id
        );

        Box::pin(
            async move {
                match gate.evaluate(&facts).await {
                    GateDecision::Pass(reason) => {
                        tracing::debug!(?reason, "Gate passed");
                        inner.call(req).await
                    }
                    GateDecision::Block => {
                        tracing::info!("Site under maintenance, serving cached error page");
                        Ok(blocked_response(&artifact, retry_after_secs).await)
                    }
                }
            }
            .instrument(span),
        )
    }
}

async fn blocked_response(artifact: &Path, retry_after_secs: Option<u64>) -> HttpResponse {
    let body = match tokio::fs::read(artifact).await {
        Ok(bytes) if !bytes.is_empty() => Bytes::from(bytes),
        Ok(_) => {
            tracing::warn!(path = %artifact.display(), "Cached error page is empty, serving fallback");
            Bytes::from_static(FALLBACK_BODY.as_bytes())
        }
        Err(e) => {
            tracing::warn!(path = %artifact.display(), error = %e, "Cached error page unreadable, serving fallback");
            Bytes::from_static(FALLBACK_BODY.as_bytes())
        }
    };
    service_unavailable(body, retry_after_secs)
}
