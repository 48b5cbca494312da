//! HttpClient - the single entry point for talking to the CRM backend.
//!
//! Attaches the stored access token, applies the request timeout and maps
//! every outcome onto [`TaskdeskError`] kinds or a normalized
//! [`ApiResponse`]. It never refreshes or rewrites stored credentials.

use crate::api_response::{ApiResponse, server_message};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, multipart};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use taskdesk_core::config::ClientConfig;
use taskdesk_core::session::CredentialStore;
use taskdesk_core::{Result, TaskdeskError};

const JSON: &str = "application/json";

/// Authenticated JSON client bound to one backend base URL.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    store: Arc<dyn CredentialStore>,
}

impl HttpClient {
    /// Creates a client from the loaded configuration.
    pub fn new(config: &ClientConfig, store: Arc<dyn CredentialStore>) -> Result<Self> {
        Self::with_base_url(config.base_url(), config.request_timeout(), store)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        timeout: Duration,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TaskdeskError::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            store,
        })
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Full URL for an endpoint path such as `/tasks/3`.
    pub fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    pub async fn get(&self, endpoint: &str) -> Result<ApiResponse> {
        self.request::<()>(Method::GET, endpoint, None).await
    }

    pub async fn delete(&self, endpoint: &str) -> Result<ApiResponse> {
        self.request::<()>(Method::DELETE, endpoint, None).await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> Result<ApiResponse> {
        self.request(Method::POST, endpoint, Some(body)).await
    }

    /// POST without a request body.
    pub async fn post_empty(&self, endpoint: &str) -> Result<ApiResponse> {
        self.request::<()>(Method::POST, endpoint, None).await
    }

    pub async fn put<B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> Result<ApiResponse> {
        self.request(Method::PUT, endpoint, Some(body)).await
    }

    /// Sends a JSON request.
    ///
    /// The stored access token, when there is one, is attached as-is: expiry
    /// is the server's call on this path.
    pub async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<ApiResponse> {
        let mut builder = self
            .client
            .request(method.clone(), self.url(endpoint))
            .header(ACCEPT, JSON)
            .header(CONTENT_TYPE, JSON);

        if let Some(body) = body {
            builder = builder.json(body);
        }
        if let Some(token) = self.store.access_token().await? {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        tracing::debug!(%method, endpoint, "Sending request");
        self.execute(builder).await
    }

    /// Sends a multipart upload.
    ///
    /// Unlike [`HttpClient::request`] the token is checked locally first and
    /// only attached while it has not expired.
    pub async fn upload(&self, endpoint: &str, form: multipart::Form) -> Result<ApiResponse> {
        let mut builder = self
            .client
            .post(self.url(endpoint))
            .header(ACCEPT, JSON)
            .multipart(form);

        match self.store.access_token().await? {
            Some(token) if !self.store.is_expired(&token) => {
                builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
            }
            Some(_) => tracing::debug!(endpoint, "Access token expired, uploading without it"),
            None => {}
        }

        tracing::debug!(endpoint, "Sending upload");
        self.execute(builder).await
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<ApiResponse> {
        let response = builder.send().await.map_err(|e| self.transport_error(e))?;
        self.read_response(response).await
    }

    async fn read_response(&self, response: Response) -> Result<ApiResponse> {
        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        if status == StatusCode::UNAUTHORIZED {
            tracing::debug!("Backend rejected credentials");
            return Err(TaskdeskError::unauthorized(
                server_message(&body).unwrap_or_else(|| "Unauthorized".to_string()),
            ));
        }

        if !status.is_success() {
            let message = server_message(&body)
                .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));
            tracing::debug!(status = status.as_u16(), %message, "Request failed");
            return Err(TaskdeskError::http(status.as_u16(), message));
        }

        ApiResponse::from_body(&body)
    }

    fn transport_error(&self, err: reqwest::Error) -> TaskdeskError {
        if err.is_timeout() {
            TaskdeskError::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else {
            TaskdeskError::Network(err.to_string())
        }
    }
}
