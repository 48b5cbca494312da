//! Persisted credentials and the store trait that holds them.

use super::model::UserProfile;
use super::token;
use crate::error::{Result, TaskdeskError};
use crate::serde_helpers::flexible_bool;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Credentials that survive process restarts.
///
/// Mirrors the signed-in part of [`super::Session`]; on startup it is the
/// source of truth.
#[derive(Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub first_time_login: bool,
    pub user_profile: Option<UserProfile>,
}

impl StoredCredentials {
    /// True when none of the four entries is set.
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none()
            && self.refresh_token.is_none()
            && !self.first_time_login
            && self.user_profile.is_none()
    }
}

impl std::fmt::Debug for StoredCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredCredentials")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("first_time_login", &self.first_time_login)
            .field("user_profile", &self.user_profile)
            .finish()
    }
}

/// Body of a successful `POST /auth/login`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default, alias = "access_token", alias = "accessToken")]
    pub token: Option<String>,
    #[serde(default, rename = "refreshToken", alias = "refresh_token")]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<UserProfile>,
    #[serde(default, alias = "firstTimeLogin", deserialize_with = "flexible_bool")]
    pub first_time_login: bool,
}

impl LoginResponse {
    /// Checks the response and turns it into the credentials to persist.
    ///
    /// Both tokens and the user must be present; an empty string counts as
    /// missing.
    pub fn into_credentials(self) -> Result<StoredCredentials> {
        let access_token = non_empty(self.token)
            .ok_or_else(|| TaskdeskError::InvalidLogin("missing access token".to_string()))?;
        let refresh_token = non_empty(self.refresh_token)
            .ok_or_else(|| TaskdeskError::InvalidLogin("missing refresh token".to_string()))?;
        let mut user = self
            .user
            .ok_or_else(|| TaskdeskError::InvalidLogin("missing user profile".to_string()))?;

        let first_time_login = self.first_time_login || user.first_time_login;
        user.first_time_login = first_time_login;

        Ok(StoredCredentials {
            access_token: Some(access_token),
            refresh_token: Some(refresh_token),
            first_time_login,
            user_profile: Some(user),
        })
    }
}

/// Body of a successful `POST /auth/refresh`.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenPair {
    #[serde(alias = "access_token", alias = "accessToken")]
    pub token: String,
    /// Some backends rotate the refresh token, some keep the old one.
    #[serde(default, rename = "refreshToken", alias = "refresh_token")]
    pub refresh_token: Option<String>,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("token", &"<redacted>")
            .field("rotated_refresh_token", &self.refresh_token.is_some())
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Persistent key/value storage for the four credential entries.
///
/// Entries are independent keys, but [`CredentialStore::save`],
/// [`CredentialStore::save_tokens`] and [`CredentialStore::clear`] must apply
/// all of their keys as one update: no caller may observe a partial write.
///
/// Implementations perform no network calls.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn access_token(&self) -> Result<Option<String>>;

    async fn set_access_token(&self, token: &str) -> Result<()>;

    async fn refresh_token(&self) -> Result<Option<String>>;

    async fn set_refresh_token(&self, token: &str) -> Result<()>;

    async fn first_time_login(&self) -> Result<bool>;

    async fn set_first_time_login(&self, value: bool) -> Result<()>;

    async fn user_profile(&self) -> Result<Option<UserProfile>>;

    async fn set_user_profile(&self, profile: &UserProfile) -> Result<()>;

    /// Reads all four entries.
    async fn load(&self) -> Result<StoredCredentials>;

    /// Replaces all four entries in one update.
    async fn save(&self, credentials: &StoredCredentials) -> Result<()>;

    /// Writes both tokens in one update, leaving the other entries alone.
    async fn save_tokens(&self, access_token: &str, refresh_token: &str) -> Result<()>;

    /// Removes all four entries in one update.
    async fn clear(&self) -> Result<()>;

    /// Whether `token`'s embedded expiry has passed. Undecodable tokens are
    /// expired.
    fn is_expired(&self, token: &str) -> bool {
        token::is_expired(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_response_scenario() {
        let raw = r#"{
            "token": "A",
            "refreshToken": "B",
            "user": {"id": 1, "name": "Ada", "email": "ada@example.com"},
            "first_time_login": 1
        }"#;
        let response: LoginResponse = serde_json::from_str(raw).unwrap();
        let creds = response.into_credentials().unwrap();

        assert_eq!(creds.access_token.as_deref(), Some("A"));
        assert_eq!(creds.refresh_token.as_deref(), Some("B"));
        assert!(creds.first_time_login);
        let user = creds.user_profile.unwrap();
        assert_eq!(user.id, 1);
        assert!(user.first_time_login);
    }

    #[test]
    fn test_login_response_missing_refresh_token() {
        let response = LoginResponse {
            token: Some("A".to_string()),
            refresh_token: None,
            user: None,
            first_time_login: false,
        };
        let err = response.into_credentials().unwrap_err();
        assert!(matches!(err, TaskdeskError::InvalidLogin(_)));
    }

    #[test]
    fn test_login_response_blank_access_token() {
        let raw = r#"{"token": "  ", "refreshToken": "B", "user": {"id": 1}}"#;
        let response: LoginResponse = serde_json::from_str(raw).unwrap();
        assert!(response.into_credentials().is_err());
    }

    #[test]
    fn test_token_pair_aliases() {
        let pair: TokenPair =
            serde_json::from_str(r#"{"access_token": "new", "refresh_token": "r2"}"#).unwrap();
        assert_eq!(pair.token, "new");
        assert_eq!(pair.refresh_token.as_deref(), Some("r2"));

        let pair: TokenPair = serde_json::from_str(r#"{"token": "only"}"#).unwrap();
        assert!(pair.refresh_token.is_none());
    }

    #[test]
    fn test_empty_credentials() {
        assert!(StoredCredentials::default().is_empty());
        let creds = StoredCredentials {
            first_time_login: true,
            ..Default::default()
        };
        assert!(!creds.is_empty());
    }
}
