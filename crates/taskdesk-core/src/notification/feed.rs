//! Notification feed trait.

use super::model::NotificationPage;
use crate::error::Result;
use async_trait::async_trait;

/// Read side of the notification endpoints, as consumed by the poller.
#[async_trait]
pub trait NotificationFeed: Send + Sync {
    /// Fetches one page of notifications (1-based).
    async fn page(&self, page: u32) -> Result<NotificationPage>;

    /// Fetches the number of unread notifications.
    async fn unread_count(&self) -> Result<u64>;
}
