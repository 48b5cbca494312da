pub mod auth;
pub mod config;
pub mod notifications;
pub mod tasks;
pub mod users;
mod utils;

pub use config::ConfigAction;
pub use notifications::NotificationAction;
pub use tasks::TaskAction;
