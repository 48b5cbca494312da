//! The `{success, data, message}` envelope every backend response is
//! normalized into.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use taskdesk_core::serde_helpers::flexible_bool;
use taskdesk_core::{Result, TaskdeskError};

const FAILED_WITHOUT_MESSAGE: &str = "Request failed";
const MISSING_DATA: &str = "Response is missing data";

/// A normalized backend response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    #[serde(deserialize_with = "flexible_bool")]
    pub success: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiResponse {
    /// A successful response around `data`.
    pub fn ok(data: Option<Value>) -> Self {
        Self {
            success: true,
            data,
            message: None,
        }
    }

    /// Normalizes a raw 2xx body.
    ///
    /// - empty body: success without data
    /// - JSON object with a `success` key: taken as the envelope itself
    /// - anything else: wrapped as the `data` of a successful envelope
    pub fn from_body(body: &str) -> Result<Self> {
        if body.trim().is_empty() {
            return Ok(Self::ok(None));
        }

        let value: Value = serde_json::from_str(body)?;
        match value {
            Value::Object(ref map) if map.contains_key("success") => {
                Ok(serde_json::from_value(value)?)
            }
            Value::Null => Ok(Self::ok(None)),
            other => Ok(Self::ok(Some(other))),
        }
    }

    /// Fails with the server message when `success` is false.
    pub fn ensure_success(&self) -> Result<()> {
        if self.success {
            Ok(())
        } else {
            Err(TaskdeskError::api(
                self.message
                    .clone()
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| FAILED_WITHOUT_MESSAGE.to_string()),
            ))
        }
    }

    /// Unwraps and decodes `data`.
    pub fn into_data<T: DeserializeOwned>(self) -> Result<T> {
        self.ensure_success()?;
        let data = self.data.ok_or_else(|| TaskdeskError::api(MISSING_DATA))?;
        Ok(serde_json::from_value(data)?)
    }
}

/// Pulls a human-readable message out of an error body.
///
/// Looks at `message` first, then `error` (either a string or an object with
/// its own `message`).
pub fn server_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| match value.get("error")? {
            Value::String(s) => Some(s.as_str()),
            Value::Object(inner) => inner.get("message").and_then(Value::as_str),
            _ => None,
        })?;
    let message = message.trim();
    (!message.is_empty()).then(|| message.to_string())
}
