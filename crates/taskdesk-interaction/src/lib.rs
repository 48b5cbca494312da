//! HTTP side of Taskdesk: the authenticated JSON client, the response
//! envelope and the backend-backed [`taskdesk_core::session::AuthGateway`].

pub mod api_response;
pub mod auth_gateway;
pub mod http_client;

pub use api_response::ApiResponse;
pub use auth_gateway::HttpAuthGateway;
pub use http_client::HttpClient;

// Re-exported so callers can build upload forms without naming reqwest.
pub use reqwest::multipart;
