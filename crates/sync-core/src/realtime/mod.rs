//! Realtime transport: wire protocol, per-connection Session state
//! machine, and the Connection Hub that fans Bus deliveries out to
//! every live Session (spec §4.6, §5, §6.1).

mod hub;
mod protocol;
mod session;

pub use hub::ConnectionHub;
pub use protocol::{ErrorData, SyncEventData, SyncRequestData, SyncResponseData, WireMessage};
pub use session::{HeartbeatConfig, Session, SessionState};
