//! Domain layer for Taskdesk.
//!
//! Holds the session, task, notification and user models, the shared error
//! type, and the traits (`CredentialStore`, `AuthGateway`, `NotificationFeed`)
//! the outer layers implement. Nothing in this crate performs I/O.

pub mod config;
pub mod error;
pub mod notification;
pub mod serde_helpers;
pub mod session;
pub mod task;
pub mod user;

// Re-export common error type
pub use error::{Result, TaskdeskError};
