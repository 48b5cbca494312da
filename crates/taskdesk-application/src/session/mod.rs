//! Session lifecycle.
//!
//! This module owns the client session: restoring it on startup, adopting
//! logins, logging out and recovering from rejected access tokens.
//!
//! # Module Structure
//!
//! - `manager`: `SessionManager`, the only writer of the session value
//! - `single_flight`: sharing of in-flight transitions between callers

mod manager;
mod single_flight;

pub use manager::SessionManager;
