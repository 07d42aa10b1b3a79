use std::collections::VecDeque;
use std::fmt::Display;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;

use crate::core::time::DateTime;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(transparent)]
pub struct NotificationId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: NotificationId,
    pub message: String,
    pub created: DateTime,
}

/// Derived events, newest first. Neither deduplicated nor capped.
#[derive(Clone, Default)]
pub struct NotificationLog {
    entries: Arc<RwLock<VecDeque<Notification>>>,
}

impl NotificationId {
    //unique within the process
    fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl Display for NotificationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Notification {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            id: NotificationId::next(),
            message: message.into(),
            created: DateTime::now(),
        }
    }

    pub fn time(&self) -> String {
        self.created.to_local_time_string()
    }
}

impl NotificationLog {
    pub async fn append(&self, notification: Notification) {
        tracing::info!("Notification: {}", notification.message);
        self.entries.write().await.push_front(notification);
    }

    pub async fn list(&self) -> Vec<Notification> {
        self.entries.read().await.iter().cloned().collect()
    }
}
