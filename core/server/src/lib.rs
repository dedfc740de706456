//! HTTP API for vidrelay.
//!
//! Serves the hub's operations as JSON endpoints. The caller's identity is
//! read from headers set by the fronting auth proxy; see [`identity`].

pub mod error;
pub mod extract;
mod handlers;
pub mod identity;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, put};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use vidrelay_common::Result;
use vidrelay_hub::Hub;

pub use error::{ApiError, ApiResult};
pub use identity::{Admin, Identity};

/// Most files accepted in one upload request.
pub const MAX_FILES_PER_REQUEST: u64 = 10;

/// Build the API router over a hub.
pub fn router(hub: Hub) -> Router {
    let body_limit = hub
        .orchestrator()
        .limits()
        .max_file_size
        .saturating_mul(MAX_FILES_PER_REQUEST);
    let body_limit = usize::try_from(body_limit).unwrap_or(usize::MAX);

    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/upload",
            post(handlers::upload).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/api/upload/remote", post(handlers::upload_remote))
        .route(
            "/api/provider/{provider}/folders",
            get(handlers::list_folder).post(handlers::create_folder),
        )
        .route(
            "/api/provider/{provider}/folders/{id}",
            delete(handlers::delete_folder),
        )
        .route(
            "/api/provider/{provider}/folders/{id}/rename",
            put(handlers::rename_folder),
        )
        .route(
            "/api/provider/{provider}/files/{id}",
            delete(handlers::delete_file),
        )
        .route(
            "/api/provider/{provider}/files/{id}/rename",
            put(handlers::rename_file),
        )
        .route(
            "/api/provider/{provider}/files/{id}/move",
            put(handlers::move_file),
        )
        .route("/api/account", get(handlers::accounts))
        .route(
            "/api/keys",
            get(handlers::key_status)
                .put(handlers::set_key)
                .delete(handlers::delete_key),
        )
        .route("/api/keys/allowed", get(handlers::allowed_providers))
        .route("/api/history", get(handlers::history))
        .route("/api/admin/keys", get(handlers::admin_keys))
        .route("/api/admin/keys/{id}", delete(handlers::admin_delete_key))
        .route("/api/admin/history", get(handlers::admin_history))
        .layer(TraceLayer::new_for_http())
        .with_state(hub)
}

/// Serve the API on an already-bound listener until Ctrl-C.
pub async fn serve(hub: Hub, listener: TcpListener) -> Result<()> {
    let addr = listener.local_addr()?;
    info!("API server listening on {}", addr);

    axum::serve(listener, router(hub))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API server stopped");
    Ok(())
}

/// Bind `addr` and serve.
pub async fn run_server(hub: Hub, addr: &str) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve(hub, listener).await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
