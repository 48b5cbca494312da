//! Notification domain module.
//!
//! Notifications are polled, never pushed. This module holds the records and
//! the [`NotificationFeed`] seam the poller reads through.

mod feed;
mod model;

// Re-export public API
pub use feed::NotificationFeed;
pub use model::{Notification, NotificationPage, NotificationSnapshot, UnreadCount};
