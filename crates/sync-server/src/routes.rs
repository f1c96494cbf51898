//! Route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Health check routes (public, no auth)
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/health", get(handlers::system_health))
}

/// Sync routes (spec §6.2, requires auth)
pub fn sync_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/sync/state",
            get(handlers::get_sync_state).put(handlers::put_sync_state),
        )
        .route("/sync/delta", get(handlers::get_delta))
        .route("/sync/events", post(handlers::create_event))
        .route(
            "/sync/offline-queue",
            get(handlers::get_offline_queue).post(handlers::queue_offline_event),
        )
        .route(
            "/sync/offline-queue/process",
            post(handlers::process_offline_queue),
        )
}

/// WebSocket upgrade route (spec §6.1, requires auth)
pub fn ws_routes() -> Router<AppState> {
    Router::new().route("/sync/ws", get(ws::ws_handler))
}
