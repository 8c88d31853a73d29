//! Axum HTTP surface of the token server.
//!
//! | Method | Path      | Operation           |
//! |--------|-----------|---------------------|
//! | GET    | `/`       | health (`ready`)    |
//! | PUT    | `/domain` | create domain       |
//! | GET    | `/domain` | get domain          |
//! | POST   | `/domain` | revalidate domain   |
//! | DELETE | `/domain` | delete domain       |
//! | GET    | `/token`  | get token           |
//! | PUT    | `/token`  | set token           |
//! | DELETE | `/token`  | delete token        |
//!
//! Anything else, including an unsupported method on a known path, is
//! answered with `404 notFound`.

pub mod error;
pub mod handlers;

use crate::config::MAX_TOKEN_VALUE_BYTES;
use crate::manager::DomainManager;
use axum::{extract::DefaultBodyLimit, routing::get, Router};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// The domain store every handler operates on.
    pub manager: Arc<DomainManager>,
}

impl AppState {
    /// Wrap a manager for use by the router.
    pub fn new(manager: Arc<DomainManager>) -> Self {
        Self { manager }
    }
}

/// Build the router with all routes, the body cap and request tracing.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health))
        .route(
            "/domain",
            get(handlers::get_domain)
                .put(handlers::create_domain)
                .post(handlers::revalidate_domain)
                .delete(handlers::delete_domain),
        )
        .route(
            "/token",
            get(handlers::get_token)
                .put(handlers::set_token)
                .delete(handlers::delete_token),
        )
        .fallback(handlers::not_found)
        .method_not_allowed_fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(MAX_TOKEN_VALUE_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Periodically reclaim expired domains.
///
/// Must be called from within a tokio runtime. The first sweep runs one
/// full `period` after spawning.
pub fn spawn_expiry_sweeper(manager: Arc<DomainManager>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match manager.purge_expired() {
                Ok(0) => {}
                Ok(removed) => debug!(removed, "expiry sweep"),
                Err(e) => warn!("Expiry sweep failed: {}", e),
            }
        }
    })
}

/// Serve on `listener` until Ctrl-C.
pub async fn serve(listener: TcpListener, manager: Arc<DomainManager>) -> std::io::Result<()> {
    serve_with_shutdown(listener, manager, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await
}

/// Serve on `listener` until `shutdown` resolves.
///
/// The expiry sweeper runs alongside the server and stops with it.
pub async fn serve_with_shutdown<F>(
    listener: TcpListener,
    manager: Arc<DomainManager>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let sweeper = spawn_expiry_sweeper(manager.clone(), manager.config().sweep_interval);
    let app = router(AppState::new(manager));

    if let Ok(addr) = listener.local_addr() {
        info!("Token server listening on {}", addr);
    }

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;

    sweeper.abort();
    info!("Token server stopped");
    result
}
