//! Organisation directory.

use crate::request::fetch;
use crate::session::SessionManager;
use std::sync::Arc;
use taskdesk_core::Result;
use taskdesk_core::user::OrganizationUser;
use taskdesk_interaction::HttpClient;

#[derive(Clone)]
pub struct UserService {
    http: Arc<HttpClient>,
    session: SessionManager,
}

impl UserService {
    pub fn new(http: Arc<HttpClient>, session: SessionManager) -> Self {
        Self { http, session }
    }

    /// `GET /organisation/users`: everyone in the signed-in user's organisation.
    pub async fn organisation_users(&self) -> Result<Vec<OrganizationUser>> {
        fetch(&self.session, "list organisation users", || {
            self.http.get("/organisation/users")
        })
        .await
    }
}
