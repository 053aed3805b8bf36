//! Client route table.
//!
//! Every navigable path maps to a [`Route`], and every route declares how it
//! is guarded. Unknown paths parse to `NotFound` and render unguarded.

use std::fmt;

use crate::guard::Capabilities;

/// A navigable client location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Root,
    Login,
    Register,
    AdminLogin,
    PendingApproval,
    CreateProfile,
    ProfileMe,
    ProfileEdit,
    Browse,
    Matches,
    History,
    Messages,
    MessageThread(String),
    Notifications,
    VerificationStatus,
    VerificationSelfie,
    VerificationId,
    Report(String),
    SettingsAccount,
    SettingsInvites,
    SettingsBlocked,
    SettingsReports,
    AdminDashboard,
    AdminPendingUsers,
    AdminPendingProfiles,
    AdminVerifications,
    AdminReports,
    AdminStatistics,
    AdminInvites,
    NotFound(String),
}

/// How a route is guarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// Redirected away from once a session is established.
    PublicOnly,
    Protected(Capabilities),
    /// Always forwards to another route.
    Redirect(Route),
    /// No guard at all.
    Open,
}

impl Route {
    /// Parse a path such as `/messages/abc?x=1`. Query strings, fragments and
    /// trailing slashes are ignored.
    #[must_use]
    pub fn parse(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Self::Root,
            ["login"] => Self::Login,
            ["register"] => Self::Register,
            ["pending-approval"] => Self::PendingApproval,
            ["create-profile"] => Self::CreateProfile,
            ["profile", "me"] => Self::ProfileMe,
            ["profile", "edit"] => Self::ProfileEdit,
            ["browse"] => Self::Browse,
            ["matches"] => Self::Matches,
            ["history"] => Self::History,
            ["messages"] => Self::Messages,
            ["messages", id] => Self::MessageThread((*id).to_owned()),
            ["notifications"] => Self::Notifications,
            ["verification", "status"] => Self::VerificationStatus,
            ["verification", "selfie"] => Self::VerificationSelfie,
            ["verification", "id"] => Self::VerificationId,
            ["report", id] => Self::Report((*id).to_owned()),
            ["settings"] => Self::SettingsAccount,
            ["settings", "invites"] => Self::SettingsInvites,
            ["settings", "blocked"] => Self::SettingsBlocked,
            ["settings", "reports"] => Self::SettingsReports,
            ["admin", "login"] => Self::AdminLogin,
            ["admin", "dashboard"] => Self::AdminDashboard,
            ["admin", "users", "pending"] => Self::AdminPendingUsers,
            ["admin", "profiles", "pending"] => Self::AdminPendingProfiles,
            ["admin", "verifications"] => Self::AdminVerifications,
            ["admin", "reports"] => Self::AdminReports,
            ["admin", "statistics"] => Self::AdminStatistics,
            ["admin", "invites"] => Self::AdminInvites,
            _ => Self::NotFound(format!("/{}", segments.join("/"))),
        }
    }

    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Root => "/".into(),
            Self::Login => "/login".into(),
            Self::Register => "/register".into(),
            Self::AdminLogin => "/admin/login".into(),
            Self::PendingApproval => "/pending-approval".into(),
            Self::CreateProfile => "/create-profile".into(),
            Self::ProfileMe => "/profile/me".into(),
            Self::ProfileEdit => "/profile/edit".into(),
            Self::Browse => "/browse".into(),
            Self::Matches => "/matches".into(),
            Self::History => "/history".into(),
            Self::Messages => "/messages".into(),
            Self::MessageThread(id) => format!("/messages/{id}"),
            Self::Notifications => "/notifications".into(),
            Self::VerificationStatus => "/verification/status".into(),
            Self::VerificationSelfie => "/verification/selfie".into(),
            Self::VerificationId => "/verification/id".into(),
            Self::Report(id) => format!("/report/{id}"),
            Self::SettingsAccount => "/settings".into(),
            Self::SettingsInvites => "/settings/invites".into(),
            Self::SettingsBlocked => "/settings/blocked".into(),
            Self::SettingsReports => "/settings/reports".into(),
            Self::AdminDashboard => "/admin/dashboard".into(),
            Self::AdminPendingUsers => "/admin/users/pending".into(),
            Self::AdminPendingProfiles => "/admin/profiles/pending".into(),
            Self::AdminVerifications => "/admin/verifications".into(),
            Self::AdminReports => "/admin/reports".into(),
            Self::AdminStatistics => "/admin/statistics".into(),
            Self::AdminInvites => "/admin/invites".into(),
            Self::NotFound(path) => path.clone(),
        }
    }

    #[must_use]
    pub fn access(&self) -> Access {
        match self {
            Self::Root => Access::Redirect(Self::Login),
            Self::Login | Self::Register | Self::AdminLogin => Access::PublicOnly,
            Self::PendingApproval => Access::Protected(Capabilities::ANY_STATUS),
            Self::CreateProfile
            | Self::SettingsAccount
            | Self::SettingsInvites
            | Self::SettingsBlocked
            | Self::SettingsReports => Access::Protected(Capabilities::ACTIVE),
            Self::ProfileMe
            | Self::ProfileEdit
            | Self::Browse
            | Self::Matches
            | Self::History
            | Self::Messages
            | Self::MessageThread(_)
            | Self::Notifications
            | Self::VerificationStatus
            | Self::VerificationSelfie
            | Self::VerificationId
            | Self::Report(_) => Access::Protected(Capabilities::MEMBER),
            Self::AdminDashboard
            | Self::AdminPendingUsers
            | Self::AdminPendingProfiles
            | Self::AdminVerifications
            | Self::AdminReports
            | Self::AdminStatistics
            | Self::AdminInvites => Access::Protected(Capabilities::ADMIN),
            Self::NotFound(_) => Access::Open,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
