//! Backend operations the session lifecycle depends on.

use super::credentials::{LoginResponse, TokenPair};
use super::model::UserProfile;
use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;

/// Email/password pair posted to the login endpoint.
#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// The auth endpoints of the backend.
///
/// Implementations authenticate requests with whatever access token is
/// currently persisted; they never write credentials themselves. Persisting
/// the results is left to the session manager.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// `POST /auth/login`
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse>;

    /// `GET /auth/me`: validates the stored access token and returns its user.
    async fn current_user(&self) -> Result<UserProfile>;

    /// `POST /auth/refresh`
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair>;

    /// `POST /auth/logout`
    async fn logout(&self) -> Result<()>;
}
