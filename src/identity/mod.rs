//! Identity: phone one-time-passcode sign-in against the external provider.
//!
//! ARCHITECTURE
//! ============
//! - `IdentityProvider` is the seam to the external service (Firebase
//!   Identity Toolkit in production, mocks in tests).
//! - `IdentitySession` owns the live credential, the durable session marker
//!   and the change channel the session store listens on. It is also the
//!   token source for the authenticated transport.
//! - `IdentityGateway` runs the OTP challenge/response and the backend
//!   exchange that follows a confirmed code.
//!
//! Token refreshes replace the credential in place and are not announced as
//! identity changes; only sign-in and sign-out are.

pub mod firebase;
pub mod gateway;
pub mod marker;
pub mod phone;
pub mod session;
pub mod verifier;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use gateway::{IdentityGateway, SignIn};
pub use session::IdentitySession;

// =============================================================================
// CREDENTIAL
// =============================================================================

/// Bearer token plus the provider-side handle it belongs to.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityCredential {
    /// Provider user handle (`localId`).
    pub uid: String,
    /// Short-lived bearer token sent to the backend.
    pub id_token: String,
    /// Long-lived token used to mint a new `id_token`.
    pub refresh_token: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl IdentityCredential {
    #[must_use]
    pub fn user(&self) -> IdentityUser {
        IdentityUser { uid: self.uid.clone(), phone_number: self.phone_number.clone(), email: self.email.clone() }
    }
}

impl fmt::Debug for IdentityCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityCredential")
            .field("uid", &self.uid)
            .field("id_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("phone_number", &self.phone_number)
            .field("email", &self.email)
            .finish()
    }
}

/// Token-free view of the signed-in identity, safe to share with readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityUser {
    pub uid: String,
    pub phone_number: Option<String>,
    pub email: Option<String>,
}

/// What the identity layer currently knows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum IdentityStatus {
    /// Restoration has not finished; nobody may assume signed-out yet.
    #[default]
    Unknown,
    SignedOut,
    SignedIn(IdentityUser),
}

impl IdentityStatus {
    #[must_use]
    pub fn user(&self) -> Option<&IdentityUser> {
        match self {
            Self::SignedIn(user) => Some(user),
            _ => None,
        }
    }
}

/// Handle for an outstanding code challenge. Only valid for the provider
/// that issued it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChallenge {
    /// Provider session handle (`sessionInfo`).
    pub verification_id: String,
    /// E.164 number the code was sent to.
    pub phone_number: String,
}

// =============================================================================
// PROVIDER
// =============================================================================

/// Errors reported by the identity provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("invalid phone number: {0}")]
    InvalidPhoneNumber(String),

    #[error("too many attempts, try again later")]
    RateLimited,

    #[error("anti-abuse check failed: {0}")]
    VerifierRejected(String),

    #[error("invalid verification code")]
    InvalidCode,

    #[error("verification code expired")]
    CodeExpired,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("identity session revoked: {0}")]
    SessionRevoked(String),

    #[error("identity provider not configured: {0}")]
    NotConfigured(&'static str),

    #[error("identity request failed: {0}")]
    Request(String),

    #[error("identity provider error {status}: {message}")]
    Response { status: u16, message: String },
}

/// The external identity service.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Send a one-time code to `phone_e164`, gated by a solved anti-abuse token.
    async fn send_verification_code(
        &self,
        phone_e164: &str,
        verifier_token: &str,
    ) -> Result<PendingChallenge, ProviderError>;

    /// Exchange the code for a credential.
    async fn confirm_code(&self, challenge: &PendingChallenge, code: &str) -> Result<IdentityCredential, ProviderError>;

    /// Email/password sign-in, used by the admin console only.
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<IdentityCredential, ProviderError>;

    /// Mint a new bearer token. Fails with `SessionRevoked` when the
    /// underlying session is gone.
    async fn refresh(&self, credential: &IdentityCredential) -> Result<IdentityCredential, ProviderError>;

    /// Revoke the provider session.
    async fn sign_out(&self, credential: &IdentityCredential) -> Result<(), ProviderError>;
}
