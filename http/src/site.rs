//! # SiteService
//!
//! The live site behind the gate: published error pages at their links and
//! static files from the public directory.

use crate::render::is_internal_render;
use crate::response::{self, HttpResponse};
use bytes::Bytes;
use http::{Request, Response, StatusCode};
use http_body_util::Full;
use quiesce_core::{ContentStore, Stage};
use quiesce_status::TemplateRenderer;
use std::convert::Infallible;
use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::Service;

const ERROR_PAGE_ROUTE: &str = "/error-page/";

#[derive(Clone)]
pub struct SiteService {
    store: Arc<dyn ContentStore>,
    public_dir: Arc<PathBuf>,
    template: TemplateRenderer,
}

impl SiteService {
    pub fn new(store: Arc<dyn ContentStore>, public_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            public_dir: Arc::new(public_dir.into()),
            template: TemplateRenderer::new(),
        }
    }

    async fn respond(&self, path: &str, internal: bool) -> HttpResponse {
        if let Some(rest) = path.strip_prefix(ERROR_PAGE_ROUTE) {
            return match rest.parse::<u16>() {
                Ok(code) => self.error_page(code, internal).await,
                Err(_) => response::not_found(),
            };
        }
        self.static_file(path).await
    }

    async fn error_page(&self, code: u16, internal: bool) -> HttpResponse {
        let page = match self.store.find_error_page(code, Stage::Live).await {
            Ok(Some(page)) => page,
            Ok(None) => return response::not_found(),
            Err(e) => {
                tracing::error!(code, error = %e, "Failed to load error page");
                return response::internal_error();
            }
        };

        let res = response::html(self.template.render_html(&page));
        // Visitors get the page's own status; the internal renderer needs a plain 200.
        match StatusCode::from_u16(code) {
            Ok(status) if !internal => response::with_status(res, status),
            _ => res,
        }
    }

    async fn static_file(&self, path: &str) -> HttpResponse {
        let Some(file) = resolve_public_path(&self.public_dir, path) else {
            return response::not_found();
        };

        match tokio::fs::read(&file).await {
            Ok(bytes) => {
                let mut res = Response::new(Full::new(Bytes::from(bytes)));
                res.headers_mut().insert(
                    http::header::CONTENT_TYPE,
                    http::HeaderValue::from_static(content_type_for(&file)),
                );
                res
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => response::not_found(),
            Err(e) => {
                tracing::error!(path = %file.display(), error = %e, "Failed to read static file");
                response::internal_error()
            }
        }
    }
}

/// Maps a URL path onto the public directory. Anything but plain segments is refused.
fn resolve_public_path(root: &Path, url_path: &str) -> Option<PathBuf> {
    let relative = url_path.trim_start_matches('/');
    let mut file = root.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(segment) => file.push(segment),
            _ => return None,
        }
    }
    if relative.is_empty() || relative.ends_with('/') {
        file.push("index.html");
    }
    Some(file)
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "text/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

impl<B> Service<Request<B>> for SiteService
where
    B: Send + 'static,
{
    type Response = Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let site = self.clone();
        let path = req.uri().path().to_string();
        let internal = is_internal_render(&req);

        Box::pin(async move { Ok(site.respond(&path, internal).await) })
    }
}
