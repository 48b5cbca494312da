//! Fixtures for service tests against a mock backend.

use crate::session::SessionManager;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use taskdesk_core::session::{LoginResponse, UserProfile};
use taskdesk_infrastructure::MemoryCredentialStore;
use taskdesk_interaction::{HttpAuthGateway, HttpClient};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub(crate) struct TestContext {
    pub http: Arc<HttpClient>,
    pub session: SessionManager,
}

pub(crate) fn user() -> UserProfile {
    UserProfile {
        id: 1,
        name: "Ada".to_string(),
        email: "ada@example.com".to_string(),
        organisation_id: Some(4),
        first_time_login: false,
    }
}

pub(crate) fn signed_out(server: &MockServer) -> TestContext {
    let store = Arc::new(MemoryCredentialStore::new("taskdesk"));
    let http = Arc::new(
        HttpClient::with_base_url(format!("{}/api", server.uri()), Duration::from_secs(5), store.clone())
            .unwrap(),
    );
    let gateway = Arc::new(HttpAuthGateway::new(http.clone()));
    TestContext {
        session: SessionManager::new(store, gateway),
        http,
    }
}

/// Signed in as [`user`] with `access-1` / `refresh-1`.
pub(crate) async fn authenticated(server: &MockServer) -> TestContext {
    let ctx = signed_out(server);
    ctx.session
        .login(LoginResponse {
            token: Some("access-1".to_string()),
            refresh_token: Some("refresh-1".to_string()),
            user: Some(user()),
            first_time_login: false,
        })
        .await
        .unwrap();
    ctx
}

/// Accepts `refresh-1` once, issuing `new_token`, and validates `new_token`.
pub(crate) async fn mount_refresh(server: &MockServer, new_token: &str) {
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"token": new_token, "refreshToken": "refresh-2"})),
        )
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .and(header("authorization", format!("Bearer {new_token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": user()})))
        .mount(server)
        .await;
}
