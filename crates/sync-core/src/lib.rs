//! Bookmark Sync Core Library
//!
//! Shared functionality for the bookmark sync engine:
//! - Data models for sync events and per-device sync state
//! - Event Store and Sync-State Store (sqlx/SQLite)
//! - In-process pub/sub Bus for cross-device fan-out
//! - Conflict resolution and bandwidth-optimized delta sync
//! - Realtime transport: wire protocol, Session state machine, Connection Hub
//! - Health monitoring
//! - Configuration management
//! - Error types and handling

pub mod bus;
pub mod config;
pub mod error;
pub mod health;
pub mod models;
pub mod realtime;
pub mod store;
pub mod sync;

pub use config::Config;
pub use error::{Error, Result};
