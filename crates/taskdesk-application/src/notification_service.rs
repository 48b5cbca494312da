//! Notification endpoints.

use crate::request::{execute, fetch};
use crate::session::SessionManager;
use async_trait::async_trait;
use std::sync::Arc;
use taskdesk_core::Result;
use taskdesk_core::notification::{NotificationFeed, NotificationPage, UnreadCount};
use taskdesk_interaction::HttpClient;

pub const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Clone)]
pub struct NotificationService {
    http: Arc<HttpClient>,
    session: SessionManager,
    per_page: u32,
}

impl NotificationService {
    pub fn new(http: Arc<HttpClient>, session: SessionManager) -> Self {
        Self {
            http,
            session,
            per_page: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, per_page: u32) -> Self {
        self.per_page = per_page.max(1);
        self
    }

    /// `GET /notifications?page=&per_page=` (pages are 1-based).
    pub async fn list(&self, page: u32) -> Result<NotificationPage> {
        let page = page.max(1);
        let endpoint = format!("/notifications?page={page}&per_page={}", self.per_page);
        let mut result: NotificationPage =
            fetch(&self.session, "list notifications", || self.http.get(&endpoint)).await?;
        // Bare-array responses carry no pagination of their own.
        result.page = result.page.max(page);
        result.per_page.get_or_insert(self.per_page);
        Ok(result)
    }

    /// `GET /notifications/unread-count`
    pub async fn unread_count(&self) -> Result<u64> {
        let UnreadCount(count) = fetch(&self.session, "count unread notifications", || {
            self.http.get("/notifications/unread-count")
        })
        .await?;
        Ok(count)
    }

    /// `POST /notifications/{id}/read`
    pub async fn mark_read(&self, id: i64) -> Result<()> {
        let endpoint = format!("/notifications/{id}/read");
        execute(&self.session, "mark notification read", || {
            self.http.post_empty(&endpoint)
        })
        .await
    }

    /// `POST /notifications/mark-all-read`
    pub async fn mark_all_read(&self) -> Result<()> {
        execute(&self.session, "mark all notifications read", || {
            self.http.post_empty("/notifications/mark-all-read")
        })
        .await
    }
}

#[async_trait]
impl NotificationFeed for NotificationService {
    async fn page(&self, page: u32) -> Result<NotificationPage> {
        self.list(page).await
    }

    async fn unread_count(&self) -> Result<u64> {
        NotificationService::unread_count(self).await
    }
}
