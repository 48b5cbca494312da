//! File-system side of Taskdesk: credential stores, configuration loading
//! and path resolution.

pub mod config_service;
pub mod credential_store;
pub mod paths;
pub mod storage;

pub use crate::config_service::ConfigService;
pub use crate::credential_store::{FileCredentialStore, MemoryCredentialStore};
pub use crate::paths::TaskdeskPaths;
