//! Error taxonomy for the transport and the identity/session layers.
//!
//! ERROR HANDLING
//! ==============
//! `TransportError` describes what happened on the wire and never interprets
//! business meaning. `AuthError` is what the UI sees: every variant is either
//! user-correctable (shown inline), a routing instruction (register instead of
//! login, go back to sign-in), or a degraded-backend signal.

use crate::types::AccountStatus;

// =============================================================================
// TRANSPORT
// =============================================================================

/// Failures produced by the authenticated transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// 401 with no live identity to refresh, or 401 on the single replay.
    #[error("request unauthorized")]
    Unauthorized,

    /// The forced token refresh failed; the session has been terminated.
    #[error("session expired: {0}")]
    SessionExpired(String),

    /// Any other non-success status, passed through untouched.
    #[error("backend returned status {status}")]
    Status { status: u16, body: String },

    /// Connection, timeout, or body read failure.
    #[error("request failed: {0}")]
    Network(String),

    /// The response body did not match the expected schema.
    #[error("response parse failed: {0}")]
    Decode(String),

    /// A 2xx envelope with `success: false`.
    #[error("backend reported failure: {0}")]
    Unsuccessful(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl TransportError {
    /// HTTP status carried by this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(401),
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw response body for status errors.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Status { body, .. } => Some(body),
            _ => None,
        }
    }
}

// =============================================================================
// AUTH
// =============================================================================

/// Errors surfaced by the identity gateway, sign-in flows and session store.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Bad phone number or rate-limited by the identity provider.
    #[error("could not send verification code: {0}")]
    Challenge(String),

    /// Wrong or expired one-time code. The phone step does not need restarting.
    #[error("invalid or expired verification code")]
    InvalidCode,

    /// The phone number is not tied to an account; route to registration.
    #[error("phone number is not registered")]
    UnregisteredPhone,

    /// The identity session was revoked; full sign-in is required.
    #[error("session expired: {0}")]
    SessionExpired(String),

    /// The backend could not resolve the account or profile.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The account exists but may not sign in.
    #[error("account is {0:?}")]
    AccountDisabled(AccountStatus),

    /// A non-admin account attempted the admin sign-in.
    #[error("access denied: admin only")]
    AccessDenied,

    /// Local input validation failed before any network call.
    #[error("{0}")]
    Validation(&'static str),

    /// The backend rejected the request with a message meant for the user.
    #[error("{0}")]
    Rejected(String),

    /// A flow step was invoked out of order.
    #[error("{0}")]
    InvalidState(&'static str),
}

impl AuthError {
    /// Grepable code, stable across message wording changes.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Challenge(_) => "E_CHALLENGE",
            Self::InvalidCode => "E_INVALID_CODE",
            Self::UnregisteredPhone => "E_UNREGISTERED_PHONE",
            Self::SessionExpired(_) => "E_SESSION_EXPIRED",
            Self::BackendUnavailable(_) => "E_BACKEND_UNAVAILABLE",
            Self::AccountDisabled(_) => "E_ACCOUNT_DISABLED",
            Self::AccessDenied => "E_ACCESS_DENIED",
            Self::Validation(_) => "E_VALIDATION",
            Self::Rejected(_) => "E_REJECTED",
            Self::InvalidState(_) => "E_INVALID_STATE",
        }
    }

    /// Whether the user can fix this by editing their input and retrying.
    #[must_use]
    pub fn user_correctable(&self) -> bool {
        matches!(self, Self::Challenge(_) | Self::InvalidCode | Self::Validation(_) | Self::Rejected(_))
    }
}

impl From<TransportError> for AuthError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::SessionExpired(reason) => Self::SessionExpired(reason),
            TransportError::Unauthorized => Self::SessionExpired("unauthorized".to_owned()),
            other => Self::BackendUnavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
