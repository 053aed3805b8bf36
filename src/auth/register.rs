//! Invite-gated registration.
//!
//! Steps run strictly in order: invite code, phone number, one-time code,
//! then the member's names. The phone is confirmed with the identity provider
//! only; `/auth/verify` is skipped because the number has no account yet.
//! Once `/auth/register` succeeds the session store is refreshed and the
//! member lands on profile creation.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{AuthError, TransportError};
use crate::identity::phone::mask_phone;
use crate::identity::{IdentityGateway, IdentityUser, PendingChallenge};
use crate::route::Route;
use crate::session::SessionStore;
use crate::types::{BackendErrorBody, RegisterRequest};
use crate::validate::{self, NameField};

#[cfg(test)]
#[path = "register_test.rs"]
mod tests;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStep {
    Invite,
    Phone,
    Code,
    Details,
    Done,
}

pub struct Registration {
    gateway: Arc<IdentityGateway>,
    store: Arc<SessionStore>,
    step: RegistrationStep,
    invite_code: Option<String>,
    challenge: Option<PendingChallenge>,
}

impl Registration {
    #[must_use]
    pub fn new(gateway: Arc<IdentityGateway>, store: Arc<SessionStore>) -> Self {
        Self { gateway, store, step: RegistrationStep::Invite, invite_code: None, challenge: None }
    }

    #[must_use]
    pub fn step(&self) -> RegistrationStep {
        self.step
    }

    /// Check the invite code with the backend.
    ///
    /// # Errors
    ///
    /// `Validation` for a malformed code, `Rejected` with the backend's
    /// message for an unknown, used or expired code.
    pub async fn validate_invite(&mut self, raw_code: &str) -> Result<(), AuthError> {
        self.require_step(RegistrationStep::Invite, "registration already past the invite step")?;
        let code = validate::invite_code(raw_code)?;

        self.gateway
            .api()
            .validate_invite(&code)
            .await
            .map_err(|e| rejection(e, "invalid invite code"))?;

        info!(invite = %code, "invite code accepted");
        self.invite_code = Some(code);
        self.step = RegistrationStep::Phone;
        Ok(())
    }

    /// Send the one-time code. May be repeated from the code step to resend.
    ///
    /// # Errors
    ///
    /// `Validation` for a number outside the supported format, otherwise as
    /// [`IdentityGateway::send_code`].
    pub async fn send_code(&mut self, raw_phone: &str) -> Result<(), AuthError> {
        if !matches!(self.step, RegistrationStep::Phone | RegistrationStep::Code) {
            return Err(AuthError::InvalidState("validate an invite code before entering a phone number"));
        }
        if !validate::is_valid_phone(raw_phone) {
            return Err(AuthError::Validation("enter a valid Nigerian mobile number"));
        }

        let challenge = self.gateway.send_code(raw_phone).await?;
        info!(phone = %mask_phone(&challenge.phone_number), "registration code sent");
        self.challenge = Some(challenge);
        self.step = RegistrationStep::Code;
        Ok(())
    }

    /// Confirm the one-time code and install the new identity.
    ///
    /// # Errors
    ///
    /// `InvalidCode` for a wrong code; the step is unchanged so the user can
    /// retry.
    pub async fn confirm_code(&mut self, code: &str) -> Result<IdentityUser, AuthError> {
        self.require_step(RegistrationStep::Code, "request a verification code first")?;
        let challenge = self.challenge.as_ref().ok_or(AuthError::InvalidState("request a verification code first"))?;

        let identity = self.gateway.confirm_new_identity(challenge, code).await?;
        self.step = RegistrationStep::Details;
        Ok(identity)
    }

    /// Create the account and return the next route.
    ///
    /// # Errors
    ///
    /// `Validation` for bad names, `Rejected` with the backend's message when
    /// registration is refused, `SessionExpired` if the identity is gone.
    pub async fn register(&mut self, first_name: &str, last_name: &str) -> Result<Route, AuthError> {
        self.require_step(RegistrationStep::Details, "verify your phone number first")?;
        let first_name = validate::name(first_name, NameField::First)?;
        let last_name = validate::name(last_name, NameField::Last)?;
        let invite_code = self.invite_code.clone().ok_or(AuthError::InvalidState("invite code missing"))?;

        let id_token = self.gateway.get_token(false).await?;
        let request = RegisterRequest { id_token, invite_code, first_name, last_name };
        self.gateway
            .api()
            .register(&request)
            .await
            .map_err(|e| rejection(e, "registration failed"))?;

        self.store.refresh_user_data().await;
        self.step = RegistrationStep::Done;
        info!(invite = %request.invite_code, "registration complete");
        Ok(Route::CreateProfile)
    }

    fn require_step(&self, step: RegistrationStep, message: &'static str) -> Result<(), AuthError> {
        if self.step == step { Ok(()) } else { Err(AuthError::InvalidState(message)) }
    }
}

/// Client errors carry a message for the user; everything else keeps its
/// transport meaning.
fn rejection(err: TransportError, fallback: &str) -> AuthError {
    if let TransportError::Status { status, body } = &err {
        if (400..500).contains(status) {
            let message = BackendErrorBody::parse(body).message().unwrap_or(fallback).to_owned();
            warn!(status, %message, "registration request rejected");
            return AuthError::Rejected(message);
        }
    }
    err.into()
}
