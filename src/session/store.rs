//! Session store: follows identity changes and resolves the account.
//!
//! Every identity change bumps an epoch; a backend response is applied only
//! if the epoch it was requested under is still current, so a slow `/auth/me`
//! for a previous identity can never overwrite a newer state.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::SessionSnapshot;
use crate::api::AccountApi;
use crate::error::AuthError;
use crate::identity::{IdentitySession, IdentityStatus, IdentityUser};

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;

pub struct SessionStore {
    identity: Arc<IdentitySession>,
    api: Arc<dyn AccountApi>,
    state: watch::Sender<SessionSnapshot>,
    epoch: AtomicU64,
}

impl SessionStore {
    #[must_use]
    pub fn new(identity: Arc<IdentitySession>, api: Arc<dyn AccountApi>) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::initializing());
        Self { identity, api, state, epoch: AtomicU64::new(0) }
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// Follow identity changes until the identity channel closes.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let store = Arc::clone(self);
        let mut changes = store.identity.subscribe();
        tokio::spawn(async move {
            loop {
                let status = changes.borrow_and_update().clone();
                store.apply_identity(status).await;
                if changes.changed().await.is_err() {
                    debug!("identity channel closed; session store stopping");
                    break;
                }
            }
        })
    }

    /// Transition on an identity change.
    pub async fn apply_identity(&self, status: IdentityStatus) {
        match status {
            IdentityStatus::Unknown => {}
            IdentityStatus::SignedOut => {
                self.epoch.fetch_add(1, Ordering::SeqCst);
                self.state.send_if_modified(|s| {
                    let next = SessionSnapshot::unauthenticated();
                    let changed = *s != next;
                    *s = next;
                    changed
                });
                info!("session unauthenticated");
            }
            IdentityStatus::SignedIn(identity) => self.resolve(identity).await,
        }
    }

    async fn resolve(&self, identity: IdentityUser) {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        info!(uid = %identity.uid, "resolving session");
        self.state.send_modify(|s| {
            // Initializing stays loading until this first resolution lands.
            s.identity = Some(identity);
            s.user = None;
            s.profile = None;
        });

        let result = self.api.me().await;
        if self.epoch.load(Ordering::SeqCst) != epoch {
            debug!(epoch, "discarding stale account resolution");
            return;
        }

        match result {
            Ok(me) => {
                info!(account_id = %me.user.account_id, status = ?me.user.status, "session resolved");
                self.state.send_modify(|s| {
                    s.loading = false;
                    s.user = Some(me.user);
                    s.profile = me.profile;
                });
            }
            Err(e) => {
                warn!(error = %e, "account resolution failed; continuing without user record");
                self.state.send_modify(|s| {
                    s.loading = false;
                    s.user = None;
                    s.profile = None;
                });
            }
        }
    }

    /// Re-fetch `/auth/me`. Failures are logged; the snapshot is kept.
    pub async fn refresh_user_data(&self) {
        if !self.snapshot().is_authenticated() {
            return;
        }
        let epoch = self.epoch.load(Ordering::SeqCst);
        let result = self.api.me().await;
        if self.epoch.load(Ordering::SeqCst) != epoch {
            debug!("discarding stale user refresh");
            return;
        }
        match result {
            Ok(me) => {
                self.state.send_if_modified(|s| {
                    let changed = s.user.as_ref() != Some(&me.user) || s.profile != me.profile || s.loading;
                    s.loading = false;
                    s.user = Some(me.user);
                    s.profile = me.profile;
                    changed
                });
            }
            Err(e) => warn!(error = %e, "user refresh failed"),
        }
    }

    /// Re-fetch `/profiles/me`. Failures are logged; the snapshot is kept.
    pub async fn refresh_profile(&self) {
        if !self.snapshot().is_authenticated() {
            return;
        }
        let epoch = self.epoch.load(Ordering::SeqCst);
        let result = self.api.my_profile().await;
        if self.epoch.load(Ordering::SeqCst) != epoch {
            debug!("discarding stale profile refresh");
            return;
        }
        match result {
            Ok(profile) => {
                self.state.send_if_modified(|s| {
                    let changed = s.profile != profile;
                    s.profile = profile;
                    changed
                });
            }
            Err(e) => warn!(error = %e, "profile refresh failed"),
        }
    }

    /// Revoke the identity and clear the session.
    ///
    /// # Errors
    ///
    /// Provider failures propagate; the session is left as it was.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.identity.sign_out().await?;
        self.apply_identity(IdentityStatus::SignedOut).await;
        Ok(())
    }
}
