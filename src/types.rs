//! Wire schema shared with the backend.
//!
//! DESIGN
//! ======
//! Field names follow the backend's camelCase JSON. Enums that the backend may
//! extend (notification kinds) carry an `Unknown` catch-all so a new server
//! release never breaks deserialization of the whole payload.

use serde::{Deserialize, Serialize};

use crate::error::TransportError;

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;

// =============================================================================
// ACCOUNT
// =============================================================================

/// Role attached to an account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    #[default]
    User,
    Admin,
    SuperAdmin,
}

impl AccountType {
    /// Both admin tiers unlock the admin surface.
    #[must_use]
    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin | Self::SuperAdmin)
    }
}

/// Moderation status of an account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    #[default]
    PendingApproval,
    Active,
    Suspended,
    Banned,
}

impl AccountStatus {
    /// Suspended and banned accounts may not sign in.
    #[must_use]
    pub fn is_disabled(self) -> bool {
        matches!(self, Self::Suspended | Self::Banned)
    }
}

/// Backend-resolved account record returned by `GET /auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(alias = "id")]
    pub account_id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub phone_verified: bool,
    #[serde(default)]
    pub account_type: AccountType,
    pub status: AccountStatus,
}

/// The user's matrimonial profile. Only the identifier and moderation status
/// matter to the session core; everything else is carried opaquely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

// =============================================================================
// AUTH RESPONSES
// =============================================================================

/// Standard `{ success, data }` envelope used by the auth and profile routes.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

fn default_success() -> bool {
    true
}

impl<T> Envelope<T> {
    /// Payload of a successful envelope, `None` when it carries no data.
    ///
    /// # Errors
    ///
    /// `Unsuccessful` with the backend's message when `success` is false.
    pub fn into_optional(self) -> Result<Option<T>, TransportError> {
        if self.success {
            Ok(self.data)
        } else {
            Err(TransportError::Unsuccessful(self.message.unwrap_or_else(|| "no message".to_owned())))
        }
    }

    /// Payload of a successful envelope.
    ///
    /// # Errors
    ///
    /// As [`Envelope::into_optional`], plus `Decode` when `data` is missing.
    pub fn into_data(self) -> Result<T, TransportError> {
        self.into_optional()?
            .ok_or_else(|| TransportError::Decode("envelope has no data".to_owned()))
    }
}

/// Payload of `GET /auth/me`.
#[derive(Debug, Clone, Deserialize)]
pub struct MeResponse {
    pub user: UserRecord,
    #[serde(default)]
    pub profile: Option<ProfileRecord>,
}

/// Payload of `POST /auth/verify`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifySummary {
    pub account_type: AccountType,
    pub status: AccountStatus,
    #[serde(default)]
    pub has_profile: bool,
}

/// Error body the backend attaches to rejected auth calls.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub requires_registration: bool,
}

impl BackendErrorBody {
    /// Best-effort parse; a non-JSON body yields the default.
    #[must_use]
    pub fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref().or(self.error.as_deref())
    }
}

/// Body of `POST /auth/register`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub id_token: String,
    pub invite_code: String,
    pub first_name: String,
    pub last_name: String,
}

// =============================================================================
// NOTIFICATIONS
// =============================================================================

/// Kinds of notification the backend emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewMatch,
    NewMessage,
    ProfileApproved,
    ProfileRejected,
    VerificationApproved,
    VerificationRejected,
    GuardianAlert,
    #[serde(other)]
    Unknown,
}

/// One inbox entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    /// Opaque routing payload (`matchId`, `userId`, ...).
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Payload of `GET /notifications/unread-count`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct UnreadCountResponse {
    pub count: u32,
}

/// Payload of `GET /notifications`.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationListResponse {
    pub notifications: Vec<NotificationItem>,
}
