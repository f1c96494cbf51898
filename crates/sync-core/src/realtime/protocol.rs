//! Wire protocol for the bidirectional device ↔ server socket (spec §6.1).
//!
//! Each message is a JSON object tagged by `type`. This is the shape
//! that crosses the wire; [`WireMessage`] converts to and from the
//! Sync Service's [`crate::sync::SyncMessage`] at the session boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{SyncAction, SyncEvent, SyncEventType};
use crate::sync::SyncMessage;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRequestData {
    pub last_sync_time: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResponseData {
    pub events: Vec<SyncEvent>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncEventData {
    #[serde(rename = "type")]
    pub event_type: SyncEventType,
    pub resource_id: String,
    pub action: SyncAction,
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorData {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireMessage {
    Ping {
        timestamp: DateTime<Utc>,
    },
    Pong {
        timestamp: DateTime<Utc>,
    },
    SyncRequest {
        user_id: String,
        device_id: String,
        data: SyncRequestData,
    },
    SyncResponse {
        data: SyncResponseData,
        timestamp: DateTime<Utc>,
    },
    SyncEvent {
        user_id: String,
        device_id: String,
        data: SyncEventData,
        timestamp: DateTime<Utc>,
    },
    Error {
        data: ErrorData,
    },
}

impl WireMessage {
    /// Parse an inbound frame. A JSON object with an unrecognized or
    /// missing `type` is `Malformed`, distinct from a recognized `type`
    /// the service does not dispatch (`UnknownMessageType`).
    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| Error::Malformed(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Translate a wire frame into the service-level message, checking
    /// that any peer-supplied `user_id` matches the authenticated
    /// principal (spec §6.1: mismatch is `Unauthorized`).
    pub fn into_sync_message(self, authenticated_user_id: &str, device_id: &str) -> Result<SyncMessage> {
        match self {
            WireMessage::Ping { timestamp } => Ok(SyncMessage::Ping { timestamp }),
            WireMessage::Pong { timestamp } => Ok(SyncMessage::Pong { timestamp }),
            WireMessage::SyncRequest { user_id, device_id: wire_device_id, data } => {
                check_principal(authenticated_user_id, &user_id)?;
                Ok(SyncMessage::SyncRequest {
                    user_id,
                    device_id: wire_device_id,
                    last_sync_time: data
                        .last_sync_time
                        .and_then(|secs| DateTime::from_timestamp(secs, 0)),
                })
            }
            WireMessage::SyncEvent { user_id, device_id: wire_device_id, data, timestamp } => {
                check_principal(authenticated_user_id, &user_id)?;
                let event = SyncEvent {
                    id: 0,
                    event_type: data.event_type,
                    user_id,
                    resource_id: data.resource_id,
                    action: data.action,
                    data: data.data,
                    device_id: wire_device_id,
                    status: crate::models::SyncStatus::default(),
                    timestamp,
                    created_at: timestamp,
                    updated_at: timestamp,
                };
                Ok(SyncMessage::SyncEvent { event })
            }
            WireMessage::SyncResponse { .. } | WireMessage::Error { .. } => {
                let _ = device_id;
                Err(Error::UnknownMessageType(
                    "server-originated message type received from a device".into(),
                ))
            }
        }
    }

    /// Translate a service-level message into a wire frame for sending
    /// to the device on the other end of `device_id`'s session.
    pub fn from_sync_message(msg: SyncMessage, device_id: &str) -> Self {
        match msg {
            SyncMessage::Ping { timestamp } => WireMessage::Ping { timestamp },
            SyncMessage::Pong { timestamp } => WireMessage::Pong { timestamp },
            SyncMessage::SyncResponse { events, timestamp } => WireMessage::SyncResponse {
                data: SyncResponseData { events, timestamp },
                timestamp,
            },
            SyncMessage::SyncEvent { event } => WireMessage::SyncEvent {
                user_id: event.user_id.clone(),
                device_id: device_id.to_string(),
                data: SyncEventData {
                    event_type: event.event_type,
                    resource_id: event.resource_id.clone(),
                    action: event.action,
                    data: event.data.clone(),
                },
                timestamp: event.timestamp,
            },
            SyncMessage::SyncRequest { .. } => unreachable!("server never sends sync_request"),
            SyncMessage::Error { code, message } => WireMessage::Error {
                data: ErrorData {
                    code: code.to_string(),
                    message,
                },
            },
        }
    }
}

fn check_principal(authenticated_user_id: &str, claimed_user_id: &str) -> Result<()> {
    if authenticated_user_id != claimed_user_id {
        return Err(Error::Unauthorized(format!(
            "peer claimed user_id {claimed_user_id} but session is authenticated as {authenticated_user_id}"
        )));
    }
    Ok(())
}
