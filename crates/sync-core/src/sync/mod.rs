//! Sync engine: conflict resolution, bandwidth optimization, and the
//! orchestrating Sync Service (spec §4.3, §4.4, §4.7).

mod conflict;
mod optimize;
mod service;

pub use conflict::resolve;
pub use optimize::optimize;
pub use service::{SyncMessage, SyncService};
