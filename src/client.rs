//! Client wiring.
//!
//! DESIGN
//! ======
//! `Client` owns one instance of every component and the background tasks
//! that connect them: the session store follows the identity session, and the
//! notification synchronizer follows the session store. Components talk only
//! through their watch channels, so any of them can be driven on its own in
//! tests.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;
use tracing::info;

use crate::api::BackendApi;
use crate::auth::Registration;
use crate::config::{ClientConfig, ConfigError};
use crate::error::TransportError;
use crate::identity::firebase::FirebaseProvider;
use crate::identity::marker::SessionMarker;
use crate::identity::verifier::{StaticVerifier, VerifierSource};
use crate::identity::{IdentityGateway, IdentityProvider, IdentitySession, ProviderError};
use crate::notifications::NotificationSync;
use crate::session::{ApprovalWatch, SessionSnapshot, SessionStore};
use crate::transport::Transport;

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("identity provider setup failed: {0}")]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub struct Client {
    config: ClientConfig,
    identity: Arc<IdentitySession>,
    api: Arc<BackendApi>,
    gateway: Arc<IdentityGateway>,
    session: Arc<SessionStore>,
    notifications: Arc<NotificationSync>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Client {
    /// Wire the production provider from `config`.
    ///
    /// # Errors
    ///
    /// Provider or HTTP client construction failures.
    pub fn new(config: ClientConfig, verifier_token: Option<String>) -> Result<Self, ClientError> {
        let provider = Arc::new(FirebaseProvider::new(&config.identity, config.timeouts)?);
        let verifier = Arc::new(StaticVerifier::new(verifier_token));
        Self::with_provider(config, provider, verifier)
    }

    /// Wire the client around an arbitrary identity provider.
    ///
    /// # Errors
    ///
    /// HTTP client construction failures.
    pub fn with_provider(
        config: ClientConfig,
        provider: Arc<dyn IdentityProvider>,
        verifier: Arc<dyn VerifierSource>,
    ) -> Result<Self, ClientError> {
        let marker = SessionMarker::new(config.session_file.clone());
        let identity = Arc::new(IdentitySession::new(provider, Some(marker)));
        let transport = Arc::new(Transport::new(&config.api_base_url, config.timeouts, identity.clone())?);
        let api = Arc::new(BackendApi::new(transport));
        let gateway = Arc::new(IdentityGateway::new(
            identity.clone(),
            api.clone(),
            verifier,
            config.default_country_code.clone(),
        ));
        let session = Arc::new(SessionStore::new(identity.clone(), api.clone()));
        let notifications = Arc::new(NotificationSync::new(api.clone(), config.notification_poll_interval));

        Ok(Self { config, identity, api, gateway, session, notifications, tasks: Mutex::new(Vec::new()) })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn gateway(&self) -> &Arc<IdentityGateway> {
        &self.gateway
    }

    #[must_use]
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    #[must_use]
    pub fn notifications(&self) -> &Arc<NotificationSync> {
        &self.notifications
    }

    /// Start background tasks, restore any saved identity and wait for the
    /// session to settle.
    pub async fn start(&self) -> SessionSnapshot {
        {
            let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
            if tasks.is_empty() {
                tasks.push(self.session.spawn());
                tasks.push(self.notifications.spawn(self.session.subscribe()));
            }
        }

        self.identity.restore().await;

        let mut rx = self.session.subscribe();
        let settled = rx.wait_for(|s| !s.loading).await.map(|s| SessionSnapshot::clone(&s));
        let snapshot = settled.unwrap_or_else(|_| self.session.snapshot());
        info!(authenticated = snapshot.is_authenticated(), active = snapshot.is_active(), "client started");
        snapshot
    }

    /// A registration flow bound to this client's session.
    #[must_use]
    pub fn registration(&self) -> Registration {
        Registration::new(self.gateway.clone(), self.session.clone())
    }

    /// A pending-approval watcher bound to this client's session.
    #[must_use]
    pub fn approval_watch(&self) -> Arc<ApprovalWatch> {
        Arc::new(ApprovalWatch::new(self.session.clone(), self.api.clone(), self.config.approval_poll_interval))
    }

    /// Stop every background task. The saved identity is left in place.
    pub fn shutdown(&self) {
        self.notifications.set_eligible(false);
        for task in self.tasks.lock().unwrap_or_else(PoisonError::into_inner).drain(..) {
            task.abort();
        }
        info!("client stopped");
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        for task in self.tasks.get_mut().unwrap_or_else(PoisonError::into_inner).drain(..) {
            task.abort();
        }
    }
}
