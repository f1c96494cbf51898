//! Health monitor
//!
//! Checks system resources and dependent-service availability (storage,
//! bus) for the ambient `/health` endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Overall health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// All systems operational
    Healthy,
    /// Some systems degraded
    Degraded,
    /// Critical issues
    Unhealthy,
}

/// System resource information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemResources {
    /// Uptime in seconds
    pub uptime_secs: u64,
    /// Memory usage estimate (bytes in use by the process)
    pub memory_usage_bytes: u64,
    /// Whether the database is accessible
    pub database_connected: bool,
}

/// Individual service health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceHealth {
    /// Service name
    pub name: String,
    /// Whether the service is available
    pub available: bool,
    /// Last check timestamp
    pub last_check: DateTime<Utc>,
    /// Response time in ms (None if unavailable)
    pub response_time_ms: Option<u64>,
    /// Optional status message
    pub message: Option<String>,
}

/// Health report combining all checks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    /// Overall status
    pub status: HealthStatus,
    /// System resource info
    pub resources: SystemResources,
    /// Individual service health checks
    pub services: Vec<ServiceHealth>,
    /// When this report was generated
    pub timestamp: DateTime<Utc>,
}

/// Health monitor
pub struct HealthMonitor {
    start_time: Instant,
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthMonitor {
    /// Create a new health monitor
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    /// Get system uptime
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Get system resources
    pub fn system_resources(&self, db_connected: bool) -> SystemResources {
        SystemResources {
            uptime_secs: self.uptime_secs(),
            memory_usage_bytes: 0, // Would use sysinfo crate in production
            database_connected: db_connected,
        }
    }

    /// Build a health report. `services` typically covers the event
    /// store, sync-state store, and bus.
    pub fn report(&self, db_connected: bool, services: Vec<ServiceHealth>) -> HealthReport {
        let resources = self.system_resources(db_connected);

        let status = if !db_connected {
            HealthStatus::Unhealthy
        } else if services.iter().any(|s| !s.available) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        HealthReport {
            status,
            resources,
            services,
            timestamp: Utc::now(),
        }
    }

    /// Create a service health entry
    pub fn check_service(
        name: impl Into<String>,
        available: bool,
        response_time_ms: Option<u64>,
        message: Option<String>,
    ) -> ServiceHealth {
        ServiceHealth {
            name: name.into(),
            available,
            last_check: Utc::now(),
            response_time_ms,
            message,
        }
    }
}
