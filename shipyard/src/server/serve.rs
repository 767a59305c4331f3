//! HTTP server setup

use std::future::Future;
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::options::ServerOptions;
use crate::errors::ShipyardError;
use crate::models::channel::{CdnChannel, SteamChannel};
use crate::server::auth::require_auth;
use crate::server::channels::{create_channel, delete_channel, list_channels, update_channel};
use crate::server::handlers::{health_handler, version_handler};
use crate::server::jobs::{clear_queue, create_job, list_jobs};
use crate::server::logs::{history_handler, tail_handler};
use crate::server::mappings::{create_mapping, delete_mapping, list_mappings, update_mapping};
use crate::server::state::ServerState;
use crate::server::webhooks::build_webhook_handler;

/// Build the application router
pub fn router(state: Arc<ServerState>) -> Router {
    let api = Router::new()
        // Jobs
        .route("/api/jobs", post(create_job).get(list_jobs).delete(clear_queue))
        // Logs
        .route("/api/jobs/{id}/logs", get(history_handler))
        .route("/api/jobs/{id}/logs/tail", get(tail_handler))
        // Channels
        .route(
            "/api/channels/steam",
            get(list_channels::<SteamChannel>).post(create_channel::<SteamChannel>),
        )
        .route(
            "/api/channels/steam/{id}",
            put(update_channel::<SteamChannel>).delete(delete_channel::<SteamChannel>),
        )
        .route(
            "/api/channels/cdn",
            get(list_channels::<CdnChannel>).post(create_channel::<CdnChannel>),
        )
        .route(
            "/api/channels/cdn/{id}",
            put(update_channel::<CdnChannel>).delete(delete_channel::<CdnChannel>),
        )
        // Webhook mappings
        .route("/api/webhooks/mappings", get(list_mappings).post(create_mapping))
        .route(
            "/api/webhooks/mappings/{id}",
            put(update_mapping).delete(delete_mapping),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        // Health and version
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        // Webhooks authenticate on their own
        .route("/api/webhooks/build", post(build_webhook_handler))
        .merge(api)
        // State and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server
pub async fn serve(
    options: &ServerOptions,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), ShipyardError>>, ShipyardError> {
    let app = router(state);

    let addr = format!("{}:{}", options.host, options.port);
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| ShipyardError::ServerError(e.to_string()))?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ShipyardError::ServerError(e.to_string()))
    });

    Ok(handle)
}
