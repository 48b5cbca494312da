//! Namespaced key/value layout shared by the credential stores.
//!
//! Each credential is its own string entry under `<namespace>.<key>`; the
//! user profile is stored as serialized JSON. Other keys in the document are
//! preserved untouched.

use std::collections::BTreeMap;
use taskdesk_core::Result;
use taskdesk_core::session::{StoredCredentials, UserProfile};

const ACCESS_TOKEN: &str = "access_token";
const REFRESH_TOKEN: &str = "refresh_token";
const FIRST_TIME_LOGIN: &str = "first_time_login";
const USER_PROFILE: &str = "user_profile";

/// The four fully-qualified keys for one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialKeys {
    pub access_token: String,
    pub refresh_token: String,
    pub first_time_login: String,
    pub user_profile: String,
}

impl CredentialKeys {
    pub fn new(namespace: &str) -> Self {
        let key = |name: &str| format!("{namespace}.{name}");
        Self {
            access_token: key(ACCESS_TOKEN),
            refresh_token: key(REFRESH_TOKEN),
            first_time_login: key(FIRST_TIME_LOGIN),
            user_profile: key(USER_PROFILE),
        }
    }

    pub fn all(&self) -> [&str; 4] {
        [
            self.access_token.as_str(),
            self.refresh_token.as_str(),
            self.first_time_login.as_str(),
            self.user_profile.as_str(),
        ]
    }
}

/// Raw persisted entries.
pub type CredentialDocument = BTreeMap<String, String>;

pub fn read_string(doc: &CredentialDocument, key: &str) -> Option<String> {
    doc.get(key).filter(|v| !v.is_empty()).cloned()
}

pub fn read_flag(doc: &CredentialDocument, key: &str) -> bool {
    doc.get(key).is_some_and(|v| v == "true")
}

/// Reads the stored profile. A value that no longer decodes is treated as
/// absent so a stale entry cannot wedge startup.
pub fn read_profile(doc: &CredentialDocument, key: &str) -> Option<UserProfile> {
    let raw = doc.get(key)?;
    match serde_json::from_str(raw) {
        Ok(profile) => Some(profile),
        Err(e) => {
            tracing::warn!(error = %e, "Discarding undecodable stored user profile");
            None
        }
    }
}

pub fn write_flag(doc: &mut CredentialDocument, key: &str, value: bool) {
    if value {
        doc.insert(key.to_string(), "true".to_string());
    } else {
        doc.remove(key);
    }
}

pub fn write_profile(doc: &mut CredentialDocument, key: &str, profile: &UserProfile) -> Result<()> {
    doc.insert(key.to_string(), serde_json::to_string(profile)?);
    Ok(())
}

fn write_optional(doc: &mut CredentialDocument, key: &str, value: Option<&str>) {
    match value {
        Some(v) => {
            doc.insert(key.to_string(), v.to_string());
        }
        None => {
            doc.remove(key);
        }
    }
}

pub fn read_all(doc: &CredentialDocument, keys: &CredentialKeys) -> StoredCredentials {
    StoredCredentials {
        access_token: read_string(doc, &keys.access_token),
        refresh_token: read_string(doc, &keys.refresh_token),
        first_time_login: read_flag(doc, &keys.first_time_login),
        user_profile: read_profile(doc, &keys.user_profile),
    }
}

/// Replaces all four entries. Encodes the profile first so a failure leaves
/// the document unchanged.
pub fn write_all(
    doc: &mut CredentialDocument,
    keys: &CredentialKeys,
    credentials: &StoredCredentials,
) -> Result<()> {
    let profile = credentials
        .user_profile
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    write_optional(doc, &keys.access_token, credentials.access_token.as_deref());
    write_optional(doc, &keys.refresh_token, credentials.refresh_token.as_deref());
    write_flag(doc, &keys.first_time_login, credentials.first_time_login);
    write_optional(doc, &keys.user_profile, profile.as_deref());
    Ok(())
}

pub fn remove_all(doc: &mut CredentialDocument, keys: &CredentialKeys) {
    for key in keys.all() {
        doc.remove(key);
    }
}
