//! Path management for Taskdesk configuration files.
//!
//! Everything lives under the platform configuration directory resolved by
//! the `dirs` crate, so the layout is consistent across Linux, macOS and
//! Windows.

use std::path::{Path, PathBuf};

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// The platform configuration directory could not be determined.
    ConfigDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot find configuration directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for taskdesk_core::TaskdeskError {
    fn from(e: PathError) -> Self {
        taskdesk_core::TaskdeskError::config(e.to_string())
    }
}

const APP_DIR: &str = "taskdesk";
const CONFIG_FILE: &str = "config.toml";
const CREDENTIALS_FILE: &str = "credentials.json";
const LOG_DIR: &str = "logs";

/// Resolved locations of Taskdesk's files.
///
/// # Directory Structure
///
/// ```text
/// ~/.config/taskdesk/          # Root (platform config dir + "taskdesk")
/// ├── config.toml              # Client configuration
/// ├── credentials.json         # Stored session credentials (0600)
/// └── logs/                    # Optional rolling log files
///     └── taskdesk.log.YYYY-MM-DD
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskdeskPaths {
    root: PathBuf,
}

impl TaskdeskPaths {
    /// Resolves the default root, or uses `root_override` when given.
    pub fn new(root_override: Option<PathBuf>) -> Result<Self, PathError> {
        match root_override {
            Some(root) => Ok(Self { root }),
            None => dirs::config_dir()
                .map(|dir| Self {
                    root: dir.join(APP_DIR),
                })
                .ok_or(PathError::ConfigDirNotFound),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn credentials_file(&self) -> PathBuf {
        self.root.join(CREDENTIALS_FILE)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.root.join(LOG_DIR)
    }
}
