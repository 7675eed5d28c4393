//! HTTP server exposed by every agent
//!
//! Every host serves the identity and diagnostic endpoints so that peers can
//! probe it. Only the acting master accepts pushed vectors and keeps a
//! meaningful aggregate.
//!
//! ## Endpoints
//!
//! - `GET /api/v1/get/hostname` - local hostname (liveness probe target)
//! - `GET /api/v1/get/host` - hostname and agent version
//! - `GET /api/v1/get/version` - agent version
//! - `GET /api/v1/get/vector` - aggregate vector snapshot
//! - `POST /api/v1/set/vector` - receive a pushed vector (master only)
//! - `GET /api/v1/ping` - `"pong"`
//! - `GET /api/v1/echo/method` - request method
//! - `ANY /api/v1/test/code/{200,401,404,405,500,501}` - bare status code
//!
//! Every JSON body is wrapped as `{"response": <payload>}`.

pub mod auth;
pub mod error;
pub mod ingest;
pub mod routes;
pub mod state;
pub mod types;

pub use error::{ApiError, ApiResult};
pub use state::ApiState;

use std::net::SocketAddr;

use anyhow::Context;
use axum::{
    Router,
    routing::{any, get},
};
use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Build the router with every endpoint
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/ping", get(routes::diagnostics::ping))
        .route("/api/v1/echo/method", get(routes::diagnostics::echo_method))
        .route("/api/v1/test/code/:code", any(routes::diagnostics::test_code))
        .route("/api/v1/get/hostname", get(routes::identity::get_hostname))
        .route("/api/v1/get/host", get(routes::identity::get_host))
        .route("/api/v1/get/version", get(routes::identity::get_version))
        .route("/api/v1/get/vector", get(routes::vector::get_vector))
        .route("/api/v1/set/vector", any(routes::vector::set_vector))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Listeners started for the local host
pub struct ServerHandle {
    addrs: Vec<SocketAddr>,
    tasks: Vec<JoinHandle<()>>,
}

impl ServerHandle {
    pub fn addrs(&self) -> &[SocketAddr] {
        &self.addrs
    }

    /// Wait for every listener to shut down
    pub async fn join(self) {
        for result in join_all(self.tasks).await {
            if let Err(e) = result {
                error!("server task failed: {e}");
            }
        }
    }
}

/// Bind one listener per address and serve `state` on all of them.
///
/// Listeners stop accepting once `stop` is cancelled.
pub async fn spawn_server(
    bind_addrs: &[SocketAddr],
    state: ApiState,
    stop: CancellationToken,
) -> anyhow::Result<ServerHandle> {
    let app = router(state);
    let mut addrs = Vec::with_capacity(bind_addrs.len());
    let mut tasks = Vec::with_capacity(bind_addrs.len());

    for bind_addr in bind_addrs {
        let listener = tokio::net::TcpListener::bind(bind_addr)
            .await
            .with_context(|| format!("failed to bind {bind_addr}"))?;
        let addr = listener.local_addr()?;
        info!("server started on {addr}");

        let app = app.clone();
        let stop = stop.clone();
        tasks.push(tokio::spawn(async move {
            let shutdown = async move { stop.cancelled().await };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!("server error on {addr}: {e}");
            }
        }));
        addrs.push(addr);
    }

    Ok(ServerHandle { addrs, tasks })
}
