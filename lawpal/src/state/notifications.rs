//! Notification queue with independent, cancellable expiry timers.
//!
//! Each notification gets its own tokio task that sleeps for the display
//! window and then removes it. Dismissing a notification aborts that task.
//! Ids are monotonic and never reused, so a late expiry can never remove a
//! different notification.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::models::{Notification, NotificationId, Severity};

/// How long a notification stays visible unless dismissed.
pub const DISPLAY_DURATION: Duration = Duration::from_millis(2000);

#[derive(Debug, Default)]
struct QueueInner {
    /// Live notifications in creation order.
    entries: Vec<Notification>,
    /// Pending expiry task per live notification.
    timers: HashMap<NotificationId, JoinHandle<()>>,
    next_id: u64,
}

impl QueueInner {
    fn remove(&mut self, id: NotificationId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|n| n.id != id);
        before != self.entries.len()
    }
}

/// Ordered, time-bounded set of notifications.
///
/// Cloning yields another handle to the same queue.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    inner: Arc<Mutex<QueueInner>>,
    display_for: Duration,
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self::with_display_duration(DISPLAY_DURATION)
    }

    pub fn with_display_duration(display_for: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(QueueInner::default())),
            display_for,
        }
    }

    /// Append a notification and schedule its removal.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn notify(&self, message: impl Into<String>, severity: Severity) -> NotificationId {
        let mut inner = self.inner.lock().await;
        inner.next_id += 1;
        let id = NotificationId(inner.next_id);
        let notification = Notification {
            id,
            message: message.into(),
            severity,
            created_at: Utc::now(),
        };
        tracing::debug!(%id, %severity, message = %notification.message, "notification raised");
        inner.entries.push(notification);

        // The task cannot observe the queue before we release the lock, so the
        // handle is always registered before the expiry can run.
        let queue = Arc::downgrade(&self.inner);
        let display_for = self.display_for;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(display_for).await;
            if let Some(queue) = queue.upgrade() {
                let mut inner = queue.lock().await;
                inner.timers.remove(&id);
                if inner.remove(id) {
                    tracing::debug!(%id, "notification expired");
                }
            }
        });
        inner.timers.insert(id, timer);
        id
    }

    /// Remove a notification now and cancel its expiry. Unknown ids are ignored.
    pub async fn dismiss(&self, id: NotificationId) {
        let mut inner = self.inner.lock().await;
        if let Some(timer) = inner.timers.remove(&id) {
            timer.abort();
        }
        if inner.remove(id) {
            tracing::debug!(%id, "notification dismissed");
        }
    }

    /// Snapshot of live notifications in creation order.
    pub async fn list(&self) -> Vec<Notification> {
        self.inner.lock().await.entries.clone()
    }

    /// Number of expiry timers still pending.
    #[cfg(test)]
    pub async fn pending_timers(&self) -> usize {
        self.inner.lock().await.timers.len()
    }
}

impl Drop for QueueInner {
    fn drop(&mut self) {
        for (_, timer) in self.timers.drain() {
            timer.abort();
        }
    }
}
