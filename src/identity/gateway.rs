//! Phone OTP sign-in: code delivery, confirmation and the backend exchange.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use tracing::{info, warn};

use super::phone::{mask_phone, normalize_phone};
use super::session::IdentitySession;
use super::verifier::{Verifier, VerifierSource};
use super::{IdentityCredential, IdentityUser, PendingChallenge, ProviderError};
use crate::api::AccountApi;
use crate::auth::landing::landing_route;
use crate::error::{AuthError, TransportError};
use crate::route::Route;
use crate::types::{BackendErrorBody, VerifySummary};

#[cfg(test)]
#[path = "gateway_test.rs"]
mod tests;

/// Outcome of a completed sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignIn {
    pub identity: IdentityUser,
    pub summary: VerifySummary,
    /// Where the UI should go next.
    pub landing: Route,
}

pub struct IdentityGateway {
    session: Arc<IdentitySession>,
    api: Arc<dyn AccountApi>,
    verifier: Arc<dyn VerifierSource>,
    country_code: String,
    attempts: AtomicU32,
}

impl IdentityGateway {
    #[must_use]
    pub fn new(
        session: Arc<IdentitySession>,
        api: Arc<dyn AccountApi>,
        verifier: Arc<dyn VerifierSource>,
        country_code: impl Into<String>,
    ) -> Self {
        Self { session, api, verifier, country_code: country_code.into(), attempts: AtomicU32::new(0) }
    }

    #[must_use]
    pub fn session(&self) -> &Arc<IdentitySession> {
        &self.session
    }

    #[must_use]
    pub fn api(&self) -> &Arc<dyn AccountApi> {
        &self.api
    }

    /// Normalize `raw_phone` and ask the provider to send a code. Each call
    /// uses a fresh verifier; a failed attempt discards it.
    ///
    /// # Errors
    ///
    /// `Challenge` for a malformed number, a rejected verifier or rate
    /// limiting; `BackendUnavailable` when the provider cannot be reached.
    pub async fn send_code(&self, raw_phone: &str) -> Result<PendingChallenge, AuthError> {
        let phone = normalize_phone(raw_phone, &self.country_code)
            .ok_or_else(|| AuthError::Challenge("enter a valid phone number".to_owned()))?;
        let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
        let masked = mask_phone(&phone);

        let verifier = Verifier::fresh();
        let sent = match self.verifier.solve(&verifier).await {
            Ok(token) => self.session.provider().send_verification_code(&phone, &token).await,
            Err(e) => Err(e),
        };

        match sent {
            Ok(challenge) => {
                info!(phone = %masked, attempt, "verification code sent");
                Ok(challenge)
            }
            Err(e) => {
                warn!(phone = %masked, attempt, error = %e, "verification code send failed; verifier discarded");
                drop(verifier);
                Err(send_error(e))
            }
        }
    }

    /// Confirm the code, then resolve the account with the backend.
    ///
    /// # Errors
    ///
    /// - `InvalidCode`: wrong or expired code; any prior identity is untouched
    /// - `UnregisteredPhone`: the backend does not know this number
    /// - `AccountDisabled`: suspended or banned; the identity is signed out
    /// - `BackendUnavailable`: provider or backend unreachable
    pub async fn confirm_code(&self, challenge: &PendingChallenge, code: &str) -> Result<SignIn, AuthError> {
        let credential = self.confirm_with_provider(challenge, code).await?;
        let identity = credential.user();
        let summary = self.install_and_verify(credential).await?;

        match landing_route(&summary) {
            Ok(landing) => {
                info!(uid = %identity.uid, %landing, "phone sign-in complete");
                Ok(SignIn { identity, summary, landing })
            }
            Err(e) => {
                warn!(uid = %identity.uid, error = %e, "sign-in refused");
                self.end_session("account disabled").await;
                Err(e)
            }
        }
    }

    /// Confirm the code for a number that has no account yet. The identity is
    /// installed without the backend exchange.
    ///
    /// # Errors
    ///
    /// `InvalidCode`, or `BackendUnavailable` when the provider fails.
    pub async fn confirm_new_identity(&self, challenge: &PendingChallenge, code: &str) -> Result<IdentityUser, AuthError> {
        let credential = self.confirm_with_provider(challenge, code).await?;
        let identity = credential.user();
        self.session.install(credential);
        Ok(identity)
    }

    /// Email/password sign-in followed by the backend exchange. Role checks
    /// are the caller's.
    ///
    /// # Errors
    ///
    /// `Rejected` for bad credentials; otherwise as [`Self::confirm_code`].
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<VerifySummary, AuthError> {
        let credential = self
            .session
            .provider()
            .sign_in_with_password(email.trim(), password)
            .await
            .map_err(|e| match e {
                ProviderError::InvalidCredentials => AuthError::Rejected("invalid email or password".to_owned()),
                other => AuthError::BackendUnavailable(other.to_string()),
            })?;
        self.install_and_verify(credential).await
    }

    /// Current bearer token; see [`IdentitySession::token`].
    ///
    /// # Errors
    ///
    /// `SessionExpired` without a live identity or after revocation.
    pub async fn get_token(&self, force_refresh: bool) -> Result<String, AuthError> {
        self.session.token(force_refresh).await
    }

    /// Sign the identity out, falling back to a local discard if the
    /// provider call fails.
    pub(crate) async fn end_session(&self, reason: &str) {
        if let Err(e) = self.session.sign_out().await {
            warn!(error = %e, "provider sign-out failed; discarding locally");
            self.session.discard(reason);
        }
    }

    async fn confirm_with_provider(&self, challenge: &PendingChallenge, code: &str) -> Result<IdentityCredential, AuthError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(AuthError::Validation("enter the verification code"));
        }
        self.session
            .provider()
            .confirm_code(challenge, code)
            .await
            .map_err(|e| match e {
                ProviderError::InvalidCode | ProviderError::CodeExpired => AuthError::InvalidCode,
                other => AuthError::BackendUnavailable(other.to_string()),
            })
    }

    async fn install_and_verify(&self, credential: IdentityCredential) -> Result<VerifySummary, AuthError> {
        let id_token = credential.id_token.clone();
        self.session.install(credential);

        match self.api.verify(&id_token).await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                let err = verify_error(e);
                warn!(error = %err, "backend verification failed");
                self.session.discard("backend verification failed");
                Err(err)
            }
        }
    }
}

fn send_error(err: ProviderError) -> AuthError {
    match err {
        ProviderError::Request(_) | ProviderError::Response { .. } | ProviderError::NotConfigured(_) => {
            AuthError::BackendUnavailable(err.to_string())
        }
        other => AuthError::Challenge(other.to_string()),
    }
}

fn verify_error(err: TransportError) -> AuthError {
    if let TransportError::Status { status, body } = &err {
        let body = BackendErrorBody::parse(body);
        match *status {
            404 if body.requires_registration => return AuthError::UnregisteredPhone,
            400 | 403 | 404 => {
                return AuthError::Rejected(body.message().unwrap_or("sign-in rejected").to_owned());
            }
            _ => {}
        }
    }
    err.into()
}
