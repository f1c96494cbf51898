//! Server middleware
//!
//! Authentication, input sanitization, and audit logging.

pub mod auth;
pub mod audit;
pub mod sanitize;
