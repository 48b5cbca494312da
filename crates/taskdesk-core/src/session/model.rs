//! Session domain model.
//!
//! `Session` is the client-side answer to "is a user logged in". It is always
//! replaced as a whole value; tokens and user are never updated separately.

use crate::serde_helpers::{flexible_bool, flexible_id, flexible_opt_id};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of the client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No user is signed in.
    #[default]
    Unauthenticated,
    /// Stored credentials are being checked against the backend.
    Validating,
    /// A user is signed in and the access token was accepted.
    Authenticated,
    /// The access token was rejected and a refresh is in progress.
    Refreshing,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Unauthenticated => "unauthenticated",
            SessionState::Validating => "validating",
            SessionState::Authenticated => "authenticated",
            SessionState::Refreshing => "refreshing",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Profile of the signed-in user as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(deserialize_with = "flexible_id")]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(
        default,
        alias = "organisationId",
        alias = "organization_id",
        alias = "organizationId",
        deserialize_with = "flexible_opt_id"
    )]
    pub organisation_id: Option<i64>,
    #[serde(
        default,
        alias = "firstTimeLogin",
        deserialize_with = "flexible_bool"
    )]
    pub first_time_login: bool,
}

/// The authoritative client-side session value.
///
/// Invariant: [`Session::is_authenticated`] holds only when the state is
/// `Authenticated` and both an access token and a user are present.
#[derive(Clone, PartialEq, Default)]
pub struct Session {
    pub state: SessionState,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub current_user: Option<UserProfile>,
}

impl Session {
    /// An empty, signed-out session.
    pub fn unauthenticated() -> Self {
        Self::default()
    }

    /// A fully populated signed-in session.
    pub fn authenticated(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        user: UserProfile,
    ) -> Self {
        Self {
            state: SessionState::Authenticated,
            access_token: Some(access_token.into()),
            refresh_token,
            current_user: Some(user),
        }
    }

    /// Returns a copy of this session moved into `state`, keeping its data.
    pub fn in_state(&self, state: SessionState) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated
            && self.access_token.is_some()
            && self.current_user.is_some()
    }

    /// True while a validation or refresh round-trip is in flight.
    pub fn is_loading(&self) -> bool {
        matches!(
            self.state,
            SessionState::Validating | SessionState::Refreshing
        )
    }

    pub fn user_id(&self) -> Option<i64> {
        self.current_user.as_ref().map(|u| u.id)
    }

    pub fn organisation_id(&self) -> Option<i64> {
        self.current_user.as_ref().and_then(|u| u.organisation_id)
    }
}

// Tokens never appear in logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("current_user", &self.current_user)
            .finish()
    }
}
