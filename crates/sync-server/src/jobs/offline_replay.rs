//! Offline-replay background job
//!
//! Periodically sweeps every `(user_id, device_id)` with pending
//! offline-queued events and replays them (spec §4.5). A device
//! normally drains its own queue by calling `process_offline` on
//! reconnect; this sweep is a backstop for events left pending because
//! the originating session never came back.

use crate::state::AppState;

/// Run one sweep of the offline queue.
pub async fn run(state: &AppState) {
    tracing::debug!("Running offline-replay sweep...");

    match state.sync_service.sweep_offline().await {
        Ok(()) => tracing::debug!("Offline-replay sweep completed"),
        Err(e) => tracing::warn!(error = %e, "Offline-replay sweep failed"),
    }
}
