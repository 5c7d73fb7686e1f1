//! HTTP Server
//!
//! The accept loop runs on the async reactor; each connection is served by
//! hyper's HTTP/1 machinery with the router as its service. Handler bodies
//! run on the bounded worker pool behind the router's execution bridge, so a
//! slow handler cannot stall the reactor.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};

use stubd_core::ServiceError;

use crate::api::AppState;
use crate::http_router::Router;

pub struct HttpServer {
    router: Arc<Router>,
}

impl HttpServer {
    /// Creates a server over shared state with `workers` handler slots.
    pub fn new(state: Arc<AppState>, workers: usize) -> Self {
        Self {
            router: Arc::new(Router::new(state, workers)),
        }
    }

    /// Binds the address and serves until the task is cancelled.
    pub async fn run(self, addr: SocketAddr) -> Result<(), ServiceError> {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(%addr, "stubd listening");
        self.serve(listener).await
    }

    /// Serves connections from an existing listener. Tests bind an ephemeral
    /// port themselves and hand the listener over.
    pub async fn serve(self, listener: TcpListener) -> Result<(), ServiceError> {
        loop {
            let (stream, peer) = listener.accept().await?;
            tracing::debug!(%peer, "accepted connection");
            let router = self.router.clone();
            tokio::spawn(async move {
                if let Err(err) = Self::serve_connection(stream, router).await {
                    tracing::warn!(error = %err, "connection error");
                }
            });
        }
    }

    async fn serve_connection(stream: TcpStream, router: Arc<Router>) -> Result<(), hyper::Error> {
        let io = TokioIo::new(stream);
        http1::Builder::new()
            .serve_connection(
                io,
                service_fn(move |req| {
                    let router = router.clone();
                    async move { Ok::<_, Infallible>(router.handle(req).await) }
                }),
            )
            .await
    }
}
