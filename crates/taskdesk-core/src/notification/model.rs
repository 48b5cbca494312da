//! Notification records.

use crate::serde_helpers::{flexible_bool, flexible_id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A single notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(deserialize_with = "flexible_id")]
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "type", alias = "kind")]
    pub kind: Option<String>,
    #[serde(
        default,
        alias = "is_read",
        alias = "isRead",
        deserialize_with = "flexible_bool"
    )]
    pub read: bool,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<String>,
}

/// One page of `GET /notifications`.
///
/// The backend returns either a bare array or an object with the list under
/// `notifications`, `items` or `data` and optional pagination fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct NotificationPage {
    pub items: Vec<Notification>,
    pub page: u32,
    pub per_page: Option<u32>,
    pub total: Option<u64>,
}

impl NotificationPage {
    /// Whether another page may exist after this one.
    pub fn has_more(&self) -> bool {
        match (self.total, self.per_page) {
            (Some(total), Some(per_page)) => u64::from(self.page) * u64::from(per_page) < total,
            _ => false,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PageWire {
    List(Vec<Notification>),
    Object {
        #[serde(alias = "items", alias = "data")]
        notifications: Vec<Notification>,
        #[serde(default, alias = "current_page", alias = "currentPage")]
        page: Option<u32>,
        #[serde(default, alias = "perPage", alias = "limit")]
        per_page: Option<u32>,
        #[serde(default)]
        total: Option<u64>,
    },
}

impl<'de> Deserialize<'de> for NotificationPage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match PageWire::deserialize(deserializer)? {
            PageWire::List(items) => NotificationPage {
                items,
                page: 1,
                per_page: None,
                total: None,
            },
            PageWire::Object {
                notifications,
                page,
                per_page,
                total,
            } => NotificationPage {
                items: notifications,
                page: page.unwrap_or(1),
                per_page,
                total,
            },
        })
    }
}

/// Body of `GET /notifications/unread-count`: `{"count": n}`,
/// `{"unread_count": n}` or a bare number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnreadCount(pub u64);

impl<'de> Deserialize<'de> for UnreadCount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Bare(u64),
            Object {
                #[serde(alias = "unread_count", alias = "unreadCount", alias = "unread")]
                count: u64,
            },
        }

        Ok(match Wire::deserialize(deserializer)? {
            Wire::Bare(count) | Wire::Object { count } => UnreadCount(count),
        })
    }
}

/// Local notification state published by the poller.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NotificationSnapshot {
    pub notifications: Vec<Notification>,
    pub unread_count: u64,
    pub last_updated: Option<DateTime<Utc>>,
}

impl NotificationSnapshot {
    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty() && self.unread_count == 0 && self.last_updated.is_none()
    }
}
