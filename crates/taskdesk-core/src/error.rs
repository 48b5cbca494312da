//! Error types for the Taskdesk client.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// HTTP status carried by [`TaskdeskError::Unauthorized`].
pub const UNAUTHORIZED_STATUS: u16 = 401;

/// A shared error type for the entire Taskdesk workspace.
///
/// Transport failures are split into distinct kinds so the session layer can
/// tell an expired credential (`Unauthorized`) apart from an unreachable
/// backend (`Timeout`, `Network`).
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TaskdeskError {
    /// The request exceeded the configured deadline.
    #[error("Request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// The backend answered 401.
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// Any other non-2xx response.
    #[error("{message}")]
    Http { status: u16, message: String },

    /// The request never produced a response.
    #[error("Network error: {0}")]
    Network(String),

    /// The backend answered with `success: false`.
    ///
    /// Displays the server message verbatim so it can be surfaced to users.
    #[error("{0}")]
    Api(String),

    /// A login response was missing one of its tokens.
    #[error("Invalid login response: {0}")]
    InvalidLogin(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Credential storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TaskdeskError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates an Unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Creates an Http error
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Creates an Api error
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a Storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is the 401 marker error
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Check if this is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Check if the request failed before any response arrived
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Network(_))
    }

    /// HTTP status associated with this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(UNAUTHORIZED_STATUS),
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for TaskdeskError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for TaskdeskError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for TaskdeskError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for TaskdeskError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, TaskdeskError>`.
pub type Result<T> = std::result::Result<T, TaskdeskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_carries_status_marker() {
        let err = TaskdeskError::unauthorized("token expired");
        assert!(err.is_unauthorized());
        assert_eq!(err.status(), Some(401));
        assert!(!err.is_transport());
    }

    #[test]
    fn test_api_error_displays_server_message() {
        let err = TaskdeskError::api("boom");
        assert_eq!(err.to_string(), "boom");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_transport_kinds() {
        assert!(TaskdeskError::Timeout { seconds: 30 }.is_timeout());
        assert!(TaskdeskError::Timeout { seconds: 30 }.is_transport());
        assert!(TaskdeskError::Network("refused".into()).is_transport());
        assert!(!TaskdeskError::http(500, "oops").is_transport());
    }

    #[test]
    fn test_io_conversion_keeps_kind() {
        let err: TaskdeskError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert!(err.to_string().contains("PermissionDenied"));
    }
}
