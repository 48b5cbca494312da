//! OrganizationUser domain model.

use crate::serde_helpers::{flexible_bool, flexible_id};
use serde::{Deserialize, Serialize};

fn active_by_default() -> bool {
    true
}

/// A member of the signed-in user's organisation, as listed by
/// `GET /organisation/users`. Used to pick task assignees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationUser {
    #[serde(deserialize_with = "flexible_id")]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(
        default = "active_by_default",
        alias = "is_active",
        alias = "isActive",
        deserialize_with = "flexible_bool"
    )]
    pub active: bool,
}

impl OrganizationUser {
    /// Name for display, falling back to the email address.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.email
        } else {
            &self.name
        }
    }
}
