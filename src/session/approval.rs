//! Pending-approval watcher.
//!
//! While an account waits for moderation, `/auth/me` is polled on a fixed
//! interval. Background failures are ignored; an explicit [`ApprovalWatch::check_now`]
//! surfaces them. Once the account turns active the session store is
//! refreshed, the approval is published and polling stops.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

use super::SessionStore;
use crate::api::AccountApi;
use crate::error::{AuthError, TransportError};
use crate::poll::PollHandle;
use crate::route::Route;
use crate::types::AccountStatus;

pub struct ApprovalWatch {
    store: Arc<SessionStore>,
    api: Arc<dyn AccountApi>,
    interval: Duration,
    approved: watch::Sender<bool>,
    poll: Mutex<Option<PollHandle>>,
}

impl ApprovalWatch {
    #[must_use]
    pub fn new(store: Arc<SessionStore>, api: Arc<dyn AccountApi>, interval: Duration) -> Self {
        let (approved, _) = watch::channel(false);
        Self { store, api, interval, approved, poll: Mutex::new(None) }
    }

    /// Route to open once approved.
    #[must_use]
    pub fn next_route() -> Route {
        Route::CreateProfile
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.approved.subscribe()
    }

    /// Begin polling. No-op if already polling.
    pub fn start(self: &Arc<Self>) {
        let mut slot = self.poll.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return;
        }
        let watch = Arc::downgrade(self);
        *slot = Some(PollHandle::start("approval", self.interval, move || {
            let watch = watch.clone();
            async move {
                if let Some(watch) = watch.upgrade() {
                    watch.poll_once().await;
                }
            }
        }));
    }

    pub fn stop(&self) {
        let handle = self.poll.lock().unwrap_or_else(PoisonError::into_inner).take();
        drop(handle);
    }

    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.poll.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Check right now. Returns whether the account is active.
    ///
    /// # Errors
    ///
    /// Backend failures, mapped to the auth taxonomy.
    pub async fn check_now(&self) -> Result<bool, AuthError> {
        self.check().await.map_err(AuthError::from)
    }

    async fn poll_once(&self) {
        if let Err(e) = self.check().await {
            debug!(error = %e, "approval poll failed; will retry");
        }
    }

    async fn check(&self) -> Result<bool, TransportError> {
        let me = self.api.me().await?;
        if me.user.status != AccountStatus::Active {
            return Ok(false);
        }
        info!(account_id = %me.user.account_id, "account approved");
        self.store.refresh_user_data().await;
        self.approved.send_replace(true);
        self.stop();
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    use crate::identity::IdentitySession;
    use crate::test_helpers::{MockBackend, MockProvider, user};
    use crate::types::AccountType;

    async fn pending_session() -> (Arc<MockBackend>, Arc<SessionStore>, Arc<ApprovalWatch>) {
        let backend = Arc::new(MockBackend::with_user(user("acc-1", AccountType::User, AccountStatus::PendingApproval)));
        let identity = Arc::new(IdentitySession::new(Arc::new(MockProvider::default()), None));
        let store = Arc::new(SessionStore::new(identity.clone(), backend.clone()));
        identity.install(MockProvider::credential("uid-1", 0));
        store.apply_identity(identity.status()).await;
        let watch = Arc::new(ApprovalWatch::new(store.clone(), backend.clone(), Duration::from_secs(15)));
        (backend, store, watch)
    }

    #[tokio::test(start_paused = true)]
    async fn polls_until_active_then_stops() {
        let (backend, store, watch) = pending_session().await;
        let mut approved = watch.subscribe();
        let calls_before = backend.me_calls.load(Ordering::SeqCst);

        watch.start();
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(!*approved.borrow());
        assert_eq!(backend.me_calls.load(Ordering::SeqCst) - calls_before, 3);

        backend.set_status(AccountStatus::Active);
        tokio::time::sleep(Duration::from_secs(15)).await;

        assert!(*approved.borrow_and_update());
        assert!(store.snapshot().is_active());
        assert!(!watch.is_polling());

        let settled = backend.me_calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(backend.me_calls.load(Ordering::SeqCst), settled);
    }

    #[tokio::test(start_paused = true)]
    async fn background_failures_are_ignored() {
        let (backend, _store, watch) = pending_session().await;
        backend.fail_me.store(true, Ordering::SeqCst);

        watch.start();
        tokio::time::sleep(Duration::from_secs(31)).await;

        assert!(watch.is_polling());
        assert!(!*watch.subscribe().borrow());
    }

    #[tokio::test]
    async fn check_now_surfaces_errors() {
        let (backend, _store, watch) = pending_session().await;

        assert!(!watch.check_now().await.unwrap());

        backend.fail_me.store(true, Ordering::SeqCst);
        assert!(matches!(watch.check_now().await, Err(AuthError::BackendUnavailable(_))));

        backend.fail_me.store(false, Ordering::SeqCst);
        backend.set_status(AccountStatus::Active);
        assert!(watch.check_now().await.unwrap());
        assert_eq!(ApprovalWatch::next_route(), Route::CreateProfile);
    }
}
