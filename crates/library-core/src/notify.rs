use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastVariant {
    Default,
    Destructive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub variant: ToastVariant,
    pub title: String,
    pub description: String,
}

impl Notification {
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self { variant: ToastVariant::Default, title: title.into(), description: description.into() }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            variant: ToastVariant::Destructive,
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Notifications kept before the oldest is dropped.
pub const TOAST_LIMIT: usize = 20;

/// Shared sink for user-facing notifications. Clones share one queue, which
/// keeps the newest [`TOAST_LIMIT`] entries until the host drains it.
#[derive(Debug, Clone, Default)]
pub struct Toaster {
    queue: Arc<Mutex<VecDeque<Notification>>>,
}

impl Toaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, notification: Notification) {
        match notification.variant {
            ToastVariant::Default => {
                info!(title = %notification.title, "{}", notification.description)
            }
            ToastVariant::Destructive => {
                warn!(title = %notification.title, "{}", notification.description)
            }
        }

        let mut queue = self.queue.lock();
        if queue.len() == TOAST_LIMIT {
            queue.pop_front();
        }
        queue.push_back(notification);
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.queue.lock().iter().cloned().collect()
    }

    pub fn last(&self) -> Option<Notification> {
        self.queue.lock().back().cloned()
    }

    pub fn drain(&self) -> Vec<Notification> {
        self.queue.lock().drain(..).collect()
    }
}
