//! Session state: who is signed in and what the backend says about them.
//!
//! ARCHITECTURE
//! ============
//! `SessionStore` is the single writer of [`SessionSnapshot`] and publishes
//! it on a `watch` channel. Guards, the notification synchronizer and the
//! CLI only ever read snapshots.
//!
//! STATES
//! ======
//! - Initializing: `loading`, nothing known yet
//! - Unauthenticated: no identity; user and profile are `None`
//! - Resolving: identity set, `/auth/me` in flight (user `None`)
//! - Resolved: user set; profile from the same response when present

pub mod approval;
pub mod store;

use serde::Serialize;

use crate::identity::IdentityUser;
use crate::types::{ProfileRecord, UserRecord};

pub use approval::ApprovalWatch;
pub use store::SessionStore;

/// One consistent view of the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub loading: bool,
    pub identity: Option<IdentityUser>,
    pub user: Option<UserRecord>,
    pub profile: Option<ProfileRecord>,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self::initializing()
    }
}

impl SessionSnapshot {
    #[must_use]
    pub fn initializing() -> Self {
        Self { loading: true, identity: None, user: None, profile: None }
    }

    #[must_use]
    pub fn unauthenticated() -> Self {
        Self { loading: false, identity: None, user: None, profile: None }
    }

    /// An identity is present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// An identity is present and the backend resolved its account.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.identity.is_some() && self.user.is_some()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.account_type.is_admin())
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.user
            .as_ref()
            .is_some_and(|u| u.status == crate::types::AccountStatus::Active)
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.user
            .as_ref()
            .is_some_and(|u| u.status == crate::types::AccountStatus::PendingApproval)
    }

    #[must_use]
    pub fn has_profile(&self) -> bool {
        self.profile.is_some()
    }

    /// Notification sync runs only for signed-in, active accounts.
    #[must_use]
    pub fn is_sync_eligible(&self) -> bool {
        self.is_authenticated() && self.is_active()
    }
}
