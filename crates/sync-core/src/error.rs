//! Error types for the bookmark sync engine
//!
//! Centralized error handling, categorized with numeric codes per the
//! error taxonomy of spec §7:
//!
//! - **Validation (4000-4099)**: bad input, rejected by the caller, never retried
//! - **Authorization (4060-4069)**: missing/invalid principal
//! - **State machine (4090-4099)**: illegal status transitions
//! - **System (5000-5099)**: storage/config/serialization failures
//! - **Infrastructure (7000-7099)**: storage/bus unavailable, retryable
//!
//! # Error Code Reference
//!
//! | Code | Error Type | Description |
//! |------|-----------|-------------|
//! | 4000 | InvalidEvent | Event failed field validation |
//! | 4001 | InvalidDevice | Empty or malformed `device_id` |
//! | 4002 | InvalidTimestamp | Zero/invalid timestamp where one is required |
//! | 4003 | UnknownMessageType | Socket message `type` not recognized |
//! | 4061 | Unauthorized | Principal missing or mismatched |
//! | 4091 | IllegalStateTransition | Event status transition not allowed |
//! | 5000 | Database | sqlx operation failed |
//! | 5001 | Config | `config` crate failed to load |
//! | 5003 | Serialization | JSON encode/decode failed |
//! | 5099 | Internal | Unexpected internal failure |
//! | 7000 | StorageUnavailable | Event/Sync-State store unreachable |
//! | 7001 | BusUnavailable | Publish to the bus failed |
//! | 7002 | Malformed | Inbound socket message could not be parsed |

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // ------------------------------------------------------------------
    // Validation (4000-4099)
    // ------------------------------------------------------------------
    /// Invalid event: a required field was empty or `type` was not in
    /// the fixed set (spec §4.1).
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    /// Invalid device: `device_id` was empty (spec §4.7).
    #[error("Invalid device: {0}")]
    InvalidDevice(String),

    /// Invalid timestamp: a zero timestamp was supplied where a real
    /// one is required (spec §4.7's `update_sync_state`).
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Unknown message type: `handle_sync_message` got a `type` it does
    /// not dispatch (spec §4.7).
    #[error("Unknown message type: {0}")]
    UnknownMessageType(String),

    /// Authorization: the peer-supplied `user_id` did not match the
    /// authenticated principal (spec §6.1).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Illegal state transition: only `pending -> synced` and
    /// `pending -> failed` are legal (spec §4.1).
    #[error("Illegal state transition: {0}")]
    IllegalStateTransition(String),

    // ------------------------------------------------------------------
    // System (5000-5099)
    // ------------------------------------------------------------------
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    // ------------------------------------------------------------------
    // Infrastructure (7000-7099)
    // ------------------------------------------------------------------
    /// Storage unavailable: the Event Store or Sync-State Store could
    /// not be reached. Operations relying on storage fail the call
    /// (spec §7).
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Bus unavailable: publish failed. Logged and swallowed by
    /// callers that can fall back to pull-based sync (spec §7's key
    /// resilience decision); surfaced here only so callers can log it.
    #[error("Bus unavailable: {0}")]
    BusUnavailable(String),

    /// Malformed: an inbound socket message could not be parsed at all
    /// (distinct from `UnknownMessageType`, which parses but dispatches
    /// to nothing).
    #[error("Malformed message: {0}")]
    Malformed(String),
}

impl Error {
    /// Numeric code for programmatic handling and for the HTTP error
    /// envelope of spec §6.2.
    pub fn code(&self) -> u16 {
        match self {
            Error::InvalidEvent(_) => 4000,
            Error::InvalidDevice(_) => 4001,
            Error::InvalidTimestamp(_) => 4002,
            Error::UnknownMessageType(_) => 4003,
            Error::Unauthorized(_) => 4061,
            Error::IllegalStateTransition(_) => 4091,

            Error::Database(_) => 5000,
            Error::Config(_) => 5001,
            Error::Configuration(_) => 5001,
            Error::Serialization(_) => 5003,
            Error::Internal(_) => 5099,

            Error::StorageUnavailable(_) => 7000,
            Error::BusUnavailable(_) => 7001,
            Error::Malformed(_) => 7002,
        }
    }

    /// The HTTP status the request surface should map this to (spec §6.2:
    /// 400 validation, 401 missing principal, 500 storage/bus).
    pub fn http_status(&self) -> u16 {
        match self {
            Error::InvalidEvent(_)
            | Error::InvalidDevice(_)
            | Error::InvalidTimestamp(_)
            | Error::UnknownMessageType(_)
            | Error::Malformed(_) => 400,
            Error::Unauthorized(_) => 401,
            Error::IllegalStateTransition(_)
            | Error::Database(_)
            | Error::Config(_)
            | Error::Configuration(_)
            | Error::Serialization(_)
            | Error::Internal(_)
            | Error::StorageUnavailable(_)
            | Error::BusUnavailable(_) => 500,
        }
    }

    /// True for transient infrastructure errors a caller may retry.
    /// Validation, authorization, and state-machine errors are never
    /// retryable (spec §7's propagation policy).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Database(_) | Error::StorageUnavailable(_) | Error::BusUnavailable(_)
        )
    }
}
