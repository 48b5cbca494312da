//! Task domain module.
//!
//! # Module Structure
//!
//! - `model`: `Task`, `TaskStatus`, `TaskPriority` and the create/update payloads
//! - `projection`: in-memory filtering and board statistics
//!
//! # Usage
//!
//! ```ignore
//! use taskdesk_core::task::{Task, TaskStatus, TaskPriority, NewTask, TaskUpdate};
//! use taskdesk_core::task::{TaskFilter, TaskStats};
//! ```

mod model;
mod projection;

// Re-export public API
pub use model::{NewTask, Task, TaskAttachment, TaskPriority, TaskStatus, TaskUpdate};
pub use projection::{TaskFilter, TaskStats};
