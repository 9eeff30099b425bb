/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `users`: Registration, login and user administration
/// - `projects`: Projects and project membership
/// - `tasks`: Tasks with their subtasks and comments
/// - `notifications`: The caller's notifications
/// - `search`: Free-text search over projects and tasks

pub mod health;
pub mod notifications;
pub mod projects;
pub mod search;
pub mod tasks;
pub mod users;

use serde::{Deserialize, Deserializer, Serialize};
use tasktrack_shared::store::Page;

/// Optional paging for list endpoints
///
/// Without either parameter the whole list is returned.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl From<PageQuery> for Page {
    fn from(query: PageQuery) -> Self {
        Page::from_query(query.page, query.page_size)
    }
}

/// Body returned by delete endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// `#[serde(default, deserialize_with = "nullable")]` for PATCH fields that
/// can be cleared: absent is `None`, `null` is `Some(None)`.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
