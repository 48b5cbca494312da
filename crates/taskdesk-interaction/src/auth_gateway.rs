//! [`AuthGateway`] over the backend's `/auth/*` endpoints.

use crate::http_client::HttpClient;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use taskdesk_core::Result;
use taskdesk_core::session::{AuthGateway, LoginRequest, LoginResponse, TokenPair, UserProfile};

pub struct HttpAuthGateway {
    http: Arc<HttpClient>,
}

impl HttpAuthGateway {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl AuthGateway for HttpAuthGateway {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse> {
        self.http.post("/auth/login", request).await?.into_data()
    }

    async fn current_user(&self) -> Result<UserProfile> {
        let data: Value = self.http.get("/auth/me").await?.into_data()?;
        // `/auth/me` answers either with the profile or with `{ user: profile }`.
        let profile = match data {
            Value::Object(mut map) if map.get("user").is_some_and(Value::is_object) => {
                map.remove("user").unwrap_or_default()
            }
            other => other,
        };
        Ok(serde_json::from_value(profile)?)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        self.http
            .post("/auth/refresh", &json!({ "refresh_token": refresh_token }))
            .await?
            .into_data()
    }

    async fn logout(&self) -> Result<()> {
        self.http.post_empty("/auth/logout").await?.ensure_success()
    }
}
