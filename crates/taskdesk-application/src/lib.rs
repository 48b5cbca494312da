//! Application layer for Taskdesk.
//!
//! This crate owns the session lifecycle and the services built on it:
//! typed task, notification and user endpoints that recover from a rejected
//! access token once, plus the background notification poller.

pub mod context;
pub mod notification_poller;
pub mod notification_service;
mod request;
pub mod session;
pub mod task_service;
pub mod user_service;

#[cfg(test)]
mod testing;

pub use context::Taskdesk;
pub use notification_poller::NotificationPoller;
pub use notification_service::NotificationService;
pub use session::SessionManager;
pub use task_service::TaskService;
pub use user_service::UserService;
