//! Fire-and-forget user notifications.

use std::{collections::VecDeque, fmt, sync::Arc};

use parking_lot::Mutex;
use tokio::sync::mpsc;

/// How a notification should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// An operation completed.
    Success,
    /// Neutral information.
    Info,
    /// An operation failed.
    Error,
}

/// A message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Presentation hint.
    pub severity: Severity,
    /// Short heading.
    pub summary: String,
    /// Message body.
    pub detail: String,
}

impl Notification {
    /// `Successful: <detail>`.
    pub fn success(detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Success,
            summary: "Successful".to_string(),
            detail: detail.into(),
        }
    }

    /// Informational message with a custom heading.
    pub fn info(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    /// `Error: <detail>`.
    pub fn error(detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: "Error".to_string(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.summary, self.detail)
    }
}

/// Destination for notifications. Delivery never fails from the caller's
/// point of view and never influences control flow.
pub trait NotificationSink: Send + Sync {
    /// Deliver `notification`.
    fn notify(&self, notification: Notification);
}

impl NotificationSink for mpsc::UnboundedSender<Notification> {
    fn notify(&self, notification: Notification) {
        // A closed receiver means nobody is looking anymore.
        let _ = self.send(notification);
    }
}

/// Bounded in-memory log of notifications.
#[derive(Debug, Clone)]
pub struct NotificationLog {
    entries: Arc<Mutex<VecDeque<Notification>>>,
    capacity: usize,
}

impl Default for NotificationLog {
    fn default() -> Self {
        Self::with_capacity(64)
    }
}

impl NotificationLog {
    /// Keep at most `capacity` entries, dropping the oldest.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity: capacity.max(1),
        }
    }

    /// Copy of the retained entries, oldest first.
    pub fn snapshot(&self) -> Vec<Notification> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Most recent entry.
    pub fn latest(&self) -> Option<Notification> {
        self.entries.lock().back().cloned()
    }

    /// Remove and return every retained entry.
    pub fn drain(&self) -> Vec<Notification> {
        self.entries.lock().drain(..).collect()
    }
}

impl NotificationSink for NotificationLog {
    fn notify(&self, notification: Notification) {
        let mut entries = self.entries.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(notification);
    }
}
