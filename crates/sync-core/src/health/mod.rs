//! Health monitoring
//!
//! System resource and dependent-service health checking.

mod monitor;

pub use monitor::{HealthMonitor, HealthReport, HealthStatus, ServiceHealth, SystemResources};
