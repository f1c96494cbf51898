//! Request handlers — the HTTP-style request/response surface (spec §6.2)
//! for callers unable to maintain a socket, plus the ambient health route.

use axum::{
    extract::{Extension, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sync_core::bus::Bus;
use sync_core::models::{SyncAction, SyncEvent, SyncEventType};
use sync_core::Error;

use crate::middleware::auth::Claims;
use crate::state::AppState;

/// Standard error envelope (spec §6.2).
#[derive(Serialize)]
struct ErrorEnvelope {
    success: bool,
    code: u16,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(ErrorEnvelope {
            success: false,
            code: self.0.code(),
            message: self.0.to_string(),
        });
        (status, body).into_response()
    }
}

/// Wraps [`sync_core::Error`] so it can be returned directly from axum
/// handlers via `Result<_, ApiError>`.
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

// ============================================================================
// Health
// ============================================================================

/// Health check handler — liveness only, no dependency checks.
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// System health handler — storage and bus connectivity (spec §9's
/// ambient `/health` endpoint).
pub async fn system_health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let bus_ok = state.bus.subscribe("__health_check__").await.is_ok();
    let bus_service = sync_core::health::HealthMonitor::check_service(
        "bus",
        bus_ok,
        None,
        if bus_ok { None } else { Some("bus subscribe failed".into()) },
    );

    let report = state.health_monitor.report(bus_ok, vec![bus_service]);
    Json(serde_json::to_value(report).unwrap_or_default())
}

// ============================================================================
// /sync/state
// ============================================================================

#[derive(Deserialize)]
pub struct DeviceQuery {
    pub device_id: String,
}

#[derive(Deserialize)]
pub struct UpdateStateBody {
    pub device_id: String,
    pub last_sync_time: DateTime<Utc>,
}

pub async fn get_sync_state(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(q): Query<DeviceQuery>,
) -> Result<Json<sync_core::models::SyncState>, ApiError> {
    let sync_state = state
        .sync_service
        .get_sync_state(&claims.sub, &q.device_id)
        .await?;
    Ok(Json(sync_state))
}

pub async fn put_sync_state(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<UpdateStateBody>,
) -> Result<StatusCode, ApiError> {
    state
        .sync_service
        .update_sync_state(&claims.sub, &body.device_id, body.last_sync_time)
        .await?;
    Ok(StatusCode::OK)
}

// ============================================================================
// /sync/delta
// ============================================================================

#[derive(Deserialize)]
pub struct DeltaQuery {
    pub device_id: String,
    pub last_sync_time: Option<i64>,
}

pub async fn get_delta(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(q): Query<DeltaQuery>,
) -> Result<Json<sync_core::models::DeltaSync>, ApiError> {
    let since = q.last_sync_time.and_then(|secs| DateTime::from_timestamp(secs, 0));
    let delta = state
        .sync_service
        .get_delta_sync(&claims.sub, &q.device_id, since)
        .await?;
    Ok(Json(delta))
}

// ============================================================================
// /sync/events and /sync/offline-queue
// ============================================================================

#[derive(Deserialize)]
pub struct CreateEventBody {
    #[serde(rename = "type")]
    pub event_type: SyncEventType,
    pub resource_id: String,
    pub action: SyncAction,
    pub data: String,
    pub device_id: String,
}

impl CreateEventBody {
    fn into_event(self, user_id: &str) -> SyncEvent {
        SyncEvent::new(
            self.event_type,
            user_id,
            self.resource_id,
            self.action,
            self.data,
            self.device_id,
        )
    }
}

pub async fn create_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<CreateEventBody>,
) -> Result<Json<SyncEvent>, ApiError> {
    let event = body.into_event(&claims.sub);
    let stored = state.sync_service.create_sync_event(event).await?;
    Ok(Json(stored))
}

#[derive(Serialize)]
pub struct OfflineQueueResponse {
    pub events: Vec<SyncEvent>,
}

pub async fn get_offline_queue(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(q): Query<DeviceQuery>,
) -> Result<Json<OfflineQueueResponse>, ApiError> {
    let events = state
        .sync_service
        .get_offline_queue(&claims.sub, &q.device_id)
        .await?;
    Ok(Json(OfflineQueueResponse { events }))
}

pub async fn queue_offline_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<CreateEventBody>,
) -> Result<Json<SyncEvent>, ApiError> {
    let event = body.into_event(&claims.sub);
    let stored = state.sync_service.queue_offline(event).await?;
    Ok(Json(stored))
}

#[derive(Deserialize)]
pub struct ProcessOfflineBody {
    pub device_id: String,
}

pub async fn process_offline_queue(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<ProcessOfflineBody>,
) -> Result<StatusCode, ApiError> {
    state
        .sync_service
        .process_offline(&claims.sub, &body.device_id)
        .await?;
    Ok(StatusCode::OK)
}
