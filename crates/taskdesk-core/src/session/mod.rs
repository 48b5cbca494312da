//! Session domain module.
//!
//! This module contains the client session model, the persisted credential
//! types and the traits the session lifecycle is built on.
//!
//! # Module Structure
//!
//! - `model`: `Session`, `SessionState`, `UserProfile`
//! - `credentials`: `StoredCredentials`, login/refresh payloads, `CredentialStore`
//! - `gateway`: `AuthGateway`, the backend auth endpoints
//! - `token`: fail-closed JWT expiry decoding
//!
//! # Usage
//!
//! ```ignore
//! use taskdesk_core::session::{Session, SessionState, UserProfile};
//! use taskdesk_core::session::{CredentialStore, StoredCredentials, LoginResponse};
//! use taskdesk_core::session::AuthGateway;
//! ```

mod credentials;
mod gateway;
mod model;
pub mod token;

// Re-export public API
pub use credentials::{CredentialStore, LoginResponse, StoredCredentials, TokenPair};
pub use gateway::{AuthGateway, LoginRequest};
pub use model::{Session, SessionState, UserProfile};
