//! Live identity session: the current credential and its change channel.
//!
//! ARCHITECTURE
//! ============
//! `IdentitySession` is the only place a credential lives. Readers get a
//! token-free [`IdentityStatus`] through a `watch` channel; the transport
//! gets tokens through [`TokenSource`]. The channel starts at
//! `IdentityStatus::Unknown` and the first `restore` always publishes a
//! settled value, including `SignedOut`, so listeners can leave their
//! initializing state.
//!
//! Forced refreshes are single-flight: concurrent callers holding the same
//! stale token wait on one provider call and share its result.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info, warn};

use super::marker::SessionMarker;
use super::{IdentityCredential, IdentityProvider, IdentityStatus, IdentityUser, ProviderError};
use crate::error::AuthError;
use crate::transport::TokenSource;

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

pub struct IdentitySession {
    provider: Arc<dyn IdentityProvider>,
    marker: Option<SessionMarker>,
    current: RwLock<Option<IdentityCredential>>,
    refresh_lock: Mutex<()>,
    status: watch::Sender<IdentityStatus>,
}

impl IdentitySession {
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>, marker: Option<SessionMarker>) -> Self {
        let (status, _) = watch::channel(IdentityStatus::Unknown);
        Self { provider, marker, current: RwLock::new(None), refresh_lock: Mutex::new(()), status }
    }

    #[must_use]
    pub fn provider(&self) -> &Arc<dyn IdentityProvider> {
        &self.provider
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<IdentityStatus> {
        self.status.subscribe()
    }

    #[must_use]
    pub fn status(&self) -> IdentityStatus {
        self.status.borrow().clone()
    }

    #[must_use]
    pub fn current_user(&self) -> Option<IdentityUser> {
        self.read().as_ref().map(IdentityCredential::user)
    }

    /// Restore the session saved by a previous run, then publish the settled
    /// status. A revoked saved session removes the marker; a transient
    /// failure keeps it for the next run.
    pub async fn restore(&self) {
        let Some(saved) = self.marker.as_ref().and_then(SessionMarker::load) else {
            debug!("no saved identity session");
            self.publish(IdentityStatus::SignedOut);
            return;
        };

        match self.provider.refresh(&saved).await {
            Ok(fresh) => {
                info!(uid = %fresh.uid, "identity session restored");
                self.install(fresh);
            }
            Err(ProviderError::SessionRevoked(reason)) => {
                warn!(%reason, "saved identity session revoked");
                self.clear_local();
                self.publish(IdentityStatus::SignedOut);
            }
            Err(e) => {
                warn!(error = %e, "saved identity session could not be restored");
                *self.write() = None;
                self.publish(IdentityStatus::SignedOut);
            }
        }
    }

    /// Make `credential` the live identity and announce the sign-in.
    pub fn install(&self, credential: IdentityCredential) {
        let user = credential.user();
        if let Some(marker) = &self.marker {
            marker.save(&credential);
        }
        *self.write() = Some(credential);
        info!(uid = %user.uid, "identity signed in");
        self.publish(IdentityStatus::SignedIn(user));
    }

    /// Current bearer token. With `force_refresh`, a new token is minted
    /// first.
    ///
    /// # Errors
    ///
    /// `SessionExpired` with no identity or a revoked refresh token;
    /// `BackendUnavailable` when the provider cannot be reached.
    pub async fn token(&self, force_refresh: bool) -> Result<String, AuthError> {
        let cached = self
            .cached_token()
            .ok_or_else(|| AuthError::SessionExpired("no identity".to_owned()))?;
        if !force_refresh {
            return Ok(cached);
        }
        self.refreshed_token(&cached).await
    }

    /// Revoke the provider session and clear local state.
    ///
    /// # Errors
    ///
    /// Provider failures propagate and leave the session intact.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let current = self.read().clone();
        if let Some(credential) = current {
            self.provider
                .sign_out(&credential)
                .await
                .map_err(|e| AuthError::BackendUnavailable(e.to_string()))?;
            info!(uid = %credential.uid, "identity signed out");
        }
        self.clear_local();
        self.publish(IdentityStatus::SignedOut);
        Ok(())
    }

    /// Drop the live identity locally without contacting the provider.
    pub fn discard(&self, reason: &str) {
        info!(%reason, "identity discarded");
        self.clear_local();
        self.publish(IdentityStatus::SignedOut);
    }

    fn clear_local(&self) {
        *self.write() = None;
        if let Some(marker) = &self.marker {
            marker.clear();
        }
    }

    fn publish(&self, status: IdentityStatus) {
        // send_replace so the value lands even with no live receivers.
        self.status.send_replace(status);
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<IdentityCredential>> {
        self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<IdentityCredential>> {
        self.current.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl TokenSource for IdentitySession {
    fn cached_token(&self) -> Option<String> {
        self.read().as_ref().map(|c| c.id_token.clone())
    }

    async fn refreshed_token(&self, stale: &str) -> Result<String, AuthError> {
        let _flight = self.refresh_lock.lock().await;

        let current = self
            .read()
            .clone()
            .ok_or_else(|| AuthError::SessionExpired("signed out".to_owned()))?;
        if current.id_token != stale {
            debug!("token already refreshed by a concurrent caller");
            return Ok(current.id_token);
        }

        let fresh = match self.provider.refresh(&current).await {
            Ok(fresh) => fresh,
            Err(ProviderError::SessionRevoked(reason)) => return Err(AuthError::SessionExpired(reason)),
            Err(e) => return Err(AuthError::BackendUnavailable(e.to_string())),
        };

        let mut slot = self.write();
        // Signed out or switched user while the refresh was in flight.
        if slot.as_ref().map(|c| c.uid.as_str()) != Some(fresh.uid.as_str()) {
            return Err(AuthError::SessionExpired("identity changed during refresh".to_owned()));
        }
        if let Some(marker) = &self.marker {
            marker.save(&fresh);
        }
        let token = fresh.id_token.clone();
        *slot = Some(fresh);
        debug!("identity token refreshed");
        Ok(token)
    }

    fn terminate(&self, reason: &str) {
        error!(%reason, "identity session terminated");
        self.clear_local();
        self.publish(IdentityStatus::SignedOut);
    }
}
