//! HTTP server for serve mode.
//!
//! Bundled files come from the in-memory snapshot of the last good build.
//! Anything else (a hand-written `index.html`, images) is served from the
//! output directory on disk. Every response carries `Cache-Control: no-cache`
//! so a reload always picks up the latest build.

use crate::dev::SharedState;
use crate::dev::state::StatusReport;
use crate::error::{CliError, Result};
use axum::{
    Json, Router,
    body::Body,
    extract::{Request, State},
    http::{HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

/// Build status endpoint.
pub const STATUS_PATH: &str = "/__kiln/status";

/// Development server bound to a socket.
pub struct DevServer {
    listener: TcpListener,
    state: SharedState,
}

impl DevServer {
    /// Bind `host:port`. Fails early so a busy port is reported before the
    /// first build.
    pub async fn bind(host: &str, port: u16, state: SharedState) -> Result<Self> {
        let listener = TcpListener::bind((host, port)).await.map_err(|e| {
            CliError::Server(format!("Failed to bind to {}:{}: {}", host, port, e))
        })?;
        Ok(Self { listener, state })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until `shutdown` resolves.
    pub async fn run(self, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
        axum::serve(self.listener, router(self.state))
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| CliError::Server(format!("Server error: {}", e)))
    }
}

/// The router, separate from the listener so it can be tested in-process.
pub fn router(state: SharedState) -> Router {
    let disk = ServeDir::new(state.out_dir());

    Router::new()
        .route(STATUS_PATH, get(handle_status))
        .fallback_service(disk)
        .layer(middleware::from_fn_with_state(state.clone(), serve_snapshot))
        .layer(middleware::map_response(no_cache))
        .with_state(state)
}

async fn handle_status(State(state): State<SharedState>) -> Json<StatusReport> {
    Json(state.status_report())
}

/// Answer from the snapshot when it has the requested file.
async fn serve_snapshot(State(state): State<SharedState>, request: Request, next: Next) -> Response {
    if request.method() == Method::GET || request.method() == Method::HEAD {
        let snapshot = state.snapshot();
        if let Some(file) = snapshot.get(request.uri().path()) {
            return (
                StatusCode::OK,
                [(header::CONTENT_TYPE, file.content_type)],
                Body::from(file.contents.clone()),
            )
                .into_response();
        }
    }
    next.run(request).await
}

async fn no_cache(mut response: Response) -> Response {
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
}
