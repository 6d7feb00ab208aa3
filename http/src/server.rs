//! Quiesce Server module
//!
//! Serves a Tower service stack over HTTP/1.1 with Hyper.

use bytes::Bytes;
use http::{Request, Response};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use std::future::Future;
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;
use tower::Service;

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("Invalid bind address {addr}: {source}")]
    Addr {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

pub fn parse_addr(addr: &str) -> Result<SocketAddr, ServeError> {
    addr.parse().map_err(|source| ServeError::Addr {
        addr: addr.to_string(),
        source,
    })
}

/// Bind `addr` and serve `service` until `shutdown` resolves.
pub async fn serve<S, F>(addr: SocketAddr, service: S, shutdown: F) -> Result<(), ServeError>
where
    S: Service<Request<Incoming>, Response = Response<Full<Bytes>>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    F: Future<Output = ()>,
{
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServeError::Bind { addr, source })?;
    tracing::info!("Quiesce listening on http://{}", addr);

    serve_listener(listener, service, shutdown).await;
    Ok(())
}

/// Accept loop over an already bound listener. One task per connection.
pub async fn serve_listener<S, F>(listener: TcpListener, service: S, shutdown: F)
where
    S: Service<Request<Incoming>, Response = Response<Full<Bytes>>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to accept connection");
                    continue;
                }
            },
            _ = &mut shutdown => {
                tracing::info!("Shutdown signal received, no longer accepting connections");
                return;
            }
        };

        let io = TokioIo::new(stream);
        let svc = TowerToHyperService::new(service.clone());

        tokio::task::spawn(async move {
            if let Err(err) = http1::Builder::new().serve_connection(io, svc).await {
                tracing::error!(%peer, "Error serving connection: {:?}", err);
            }
        });
    }
}
