//! Application state

use anyhow::Result;
use std::sync::Arc;
use sync_core::{
    bus::{Bus, InProcessBus},
    health::HealthMonitor,
    realtime::ConnectionHub,
    store::{EventStore, SqliteEventStore, SqliteSyncStateStore, SyncStateStore},
    sync::SyncService,
    Config,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,

    /// JWT signing secret, for principal verification at the request surface
    pub jwt_secret: Arc<str>,

    /// Sync orchestrator — event store + sync-state store + bus
    pub sync_service: Arc<SyncService>,

    /// Connection hub — live WebSocket sessions per `(user_id, device_id)`
    pub hub: Arc<ConnectionHub>,

    /// Bus, held directly for the health check's connectivity probe
    pub bus: Arc<dyn Bus>,

    /// Health monitor
    pub health_monitor: Arc<HealthMonitor>,
}

impl AppState {
    /// Create new application state
    pub async fn new(config: Config) -> Result<Self> {
        let events: Arc<dyn EventStore> = Arc::new(
            SqliteEventStore::new(&config.storage.database_path, config.storage.max_connections).await?,
        );
        let states: Arc<dyn SyncStateStore> = Arc::new(
            SqliteSyncStateStore::new(&config.storage.database_path, config.storage.max_connections).await?,
        );
        let bus: Arc<dyn Bus> = Arc::new(InProcessBus::new(config.bus.channel_capacity));

        let sync_service = Arc::new(SyncService::new(events, states, bus.clone()));
        let hub = Arc::new(ConnectionHub::new(bus.clone()));

        Ok(Self {
            jwt_secret: Arc::from(config.server.jwt_secret.as_str()),
            config: Arc::new(config),
            sync_service,
            hub,
            bus,
            health_monitor: Arc::new(HealthMonitor::new()),
        })
    }
}
