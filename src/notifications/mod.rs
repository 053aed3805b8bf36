//! Notification synchronizer.
//!
//! ARCHITECTURE
//! ============
//! A supervisor task watches session snapshots. While the session is
//! sync-eligible (signed in and active) a [`PollHandle`] fetches the unread
//! count immediately and then every poll interval. Losing eligibility aborts
//! the poller at once, empties the inbox and bumps an epoch so any response
//! already in flight is dropped; regaining it arms a new poller.
//!
//! Mutations are optimistic: the local inbox changes before the backend
//! call. If the call fails the list is re-fetched from the backend and the
//! error is returned.

pub mod routing;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::NotificationApi;
use crate::error::TransportError;
use crate::poll::PollHandle;
use crate::session::SessionSnapshot;
use crate::types::NotificationItem;

pub use routing::route_for;

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

/// Local mirror of the user's notifications.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inbox {
    pub unread_count: u32,
    pub notifications: Vec<NotificationItem>,
}

pub struct NotificationSync {
    api: Arc<dyn NotificationApi>,
    poll_interval: Duration,
    inbox: watch::Sender<Inbox>,
    eligible: AtomicBool,
    epoch: AtomicU64,
    poll: Mutex<Option<PollHandle>>,
}

impl NotificationSync {
    #[must_use]
    pub fn new(api: Arc<dyn NotificationApi>, poll_interval: Duration) -> Self {
        let (inbox, _) = watch::channel(Inbox::default());
        Self {
            api,
            poll_interval,
            inbox,
            eligible: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
            poll: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Inbox> {
        self.inbox.subscribe()
    }

    #[must_use]
    pub fn inbox(&self) -> Inbox {
        self.inbox.borrow().clone()
    }

    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.poll.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Gate polling on session snapshots until the session channel closes.
    pub fn spawn(self: &Arc<Self>, mut session: watch::Receiver<SessionSnapshot>) -> JoinHandle<()> {
        let sync = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                let eligible = session.borrow_and_update().is_sync_eligible();
                sync.set_eligible(eligible);
                if session.changed().await.is_err() {
                    sync.set_eligible(false);
                    break;
                }
            }
        })
    }

    /// Arm or tear down polling. Losing eligibility also clears the inbox.
    pub fn set_eligible(self: &Arc<Self>, eligible: bool) {
        let was_eligible = self.eligible.swap(eligible, Ordering::SeqCst);
        let mut slot = self.poll.lock().unwrap_or_else(PoisonError::into_inner);

        if !eligible {
            if was_eligible || slot.is_some() {
                self.epoch.fetch_add(1, Ordering::SeqCst);
                self.inbox.send_if_modified(|inbox| {
                    let changed = *inbox != Inbox::default();
                    *inbox = Inbox::default();
                    changed
                });
            }
            if let Some(handle) = slot.take() {
                handle.stop();
                info!("notification polling stopped");
            }
            return;
        }
        if slot.is_some() {
            return;
        }

        let sync = Arc::downgrade(self);
        *slot = Some(PollHandle::start("notifications", self.poll_interval, move || {
            let sync = sync.clone();
            async move {
                if let Some(sync) = sync.upgrade() {
                    sync.fetch_unread_count().await;
                }
            }
        }));
        info!(interval_ms = self.poll_interval.as_millis(), "notification polling started");
    }

    /// Refresh the unread count. No-op while ineligible; failures are logged.
    pub async fn fetch_unread_count(&self) {
        if !self.eligible.load(Ordering::SeqCst) {
            return;
        }
        let epoch = self.epoch.load(Ordering::SeqCst);
        match self.api.unread_count().await {
            Ok(count) => {
                if self.epoch.load(Ordering::SeqCst) != epoch {
                    debug!("discarding stale unread count");
                    return;
                }
                self.inbox.send_if_modified(|inbox| {
                    let changed = inbox.unread_count != count;
                    inbox.unread_count = count;
                    changed
                });
            }
            Err(e) => warn!(error = %e, "unread count fetch failed"),
        }
    }

    /// Load the full list and recompute the unread count from it. No-op while
    /// ineligible; failures are logged.
    pub async fn fetch_notifications(&self) {
        if !self.eligible.load(Ordering::SeqCst) {
            return;
        }
        let epoch = self.epoch.load(Ordering::SeqCst);
        match self.api.list().await {
            Ok(items) => {
                if self.epoch.load(Ordering::SeqCst) != epoch {
                    debug!("discarding stale notification list");
                    return;
                }
                self.inbox.send_modify(|inbox| {
                    inbox.unread_count = unread_in(&items);
                    inbox.notifications = items;
                });
            }
            Err(e) => warn!(error = %e, "notification list fetch failed"),
        }
    }

    /// Mark one notification read. The count drops only if the item is known
    /// and was unread.
    ///
    /// # Errors
    ///
    /// The backend failure, after the inbox has been reconciled.
    pub async fn mark_as_read(&self, id: &str) -> Result<(), TransportError> {
        self.inbox.send_if_modified(|inbox| {
            let Some(item) = inbox.notifications.iter_mut().find(|n| n.id == id && !n.is_read) else {
                return false;
            };
            item.is_read = true;
            inbox.unread_count = inbox.unread_count.saturating_sub(1);
            true
        });
        let result = self.api.mark_read(id).await;
        self.reconcile_on_failure(result, "mark read").await
    }

    /// Mark everything read.
    ///
    /// # Errors
    ///
    /// The backend failure, after the inbox has been reconciled.
    pub async fn mark_all_as_read(&self) -> Result<(), TransportError> {
        self.inbox.send_modify(|inbox| {
            for item in &mut inbox.notifications {
                item.is_read = true;
            }
            inbox.unread_count = 0;
        });
        let result = self.api.mark_all_read().await;
        self.reconcile_on_failure(result, "mark all read").await
    }

    /// Delete one notification. The count drops only if it was unread.
    ///
    /// # Errors
    ///
    /// The backend failure, after the inbox has been reconciled.
    pub async fn delete_notification(&self, id: &str) -> Result<(), TransportError> {
        self.inbox.send_if_modified(|inbox| {
            let Some(index) = inbox.notifications.iter().position(|n| n.id == id) else {
                return false;
            };
            let removed = inbox.notifications.remove(index);
            if !removed.is_read {
                inbox.unread_count = inbox.unread_count.saturating_sub(1);
            }
            true
        });
        let result = self.api.delete(id).await;
        self.reconcile_on_failure(result, "delete").await
    }

    async fn reconcile_on_failure(&self, result: Result<(), TransportError>, action: &str) -> Result<(), TransportError> {
        if let Err(e) = &result {
            warn!(%action, error = %e, "notification mutation failed; reconciling with backend");
            self.fetch_notifications().await;
        }
        result
    }
}

fn unread_in(items: &[NotificationItem]) -> u32 {
    u32::try_from(items.iter().filter(|n| !n.is_read).count()).unwrap_or(u32::MAX)
}
