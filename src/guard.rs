//! Route guards: pure decisions from a session snapshot to a verdict.
//!
//! DESIGN
//! ======
//! Guards never fetch and never mutate. The UI (or CLI) re-evaluates them on
//! every snapshot change. Checks run in a fixed precedence; the first match
//! wins.

use crate::route::{Access, Route};
use crate::session::SessionSnapshot;

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;

/// What a protected route requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub require_active: bool,
    pub require_profile: bool,
    pub admin_only: bool,
}

impl Capabilities {
    /// Signed in, any status. Used by the waiting page.
    pub const ANY_STATUS: Self = Self { require_active: false, require_profile: false, admin_only: false };
    /// Signed in and active.
    pub const ACTIVE: Self = Self { require_active: true, require_profile: false, admin_only: false };
    /// Active with a profile.
    pub const MEMBER: Self = Self { require_active: true, require_profile: true, admin_only: false };
    /// Admin console.
    pub const ADMIN: Self = Self { require_active: true, require_profile: false, admin_only: true };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Session not settled; show a placeholder.
    Loading,
    Render,
    Redirect(Route),
}

/// Guard for routes that need a session.
#[must_use]
pub fn protected(session: &SessionSnapshot, caps: Capabilities, route: &Route) -> Verdict {
    if session.loading {
        return Verdict::Loading;
    }
    if !session.is_resolved() {
        return Verdict::Redirect(if caps.admin_only { Route::AdminLogin } else { Route::Login });
    }
    if caps.admin_only && !session.is_admin() {
        return Verdict::Redirect(Route::Browse);
    }
    if !caps.admin_only && session.is_pending() && *route != Route::PendingApproval {
        return Verdict::Redirect(Route::PendingApproval);
    }
    if caps.require_active && !session.is_active() && !session.is_admin() {
        return Verdict::Redirect(Route::PendingApproval);
    }
    if caps.require_profile && !session.has_profile() && !session.is_admin() {
        return Verdict::Redirect(Route::CreateProfile);
    }
    Verdict::Render
}

/// Guard for sign-in and registration pages.
#[must_use]
pub fn public_only(session: &SessionSnapshot) -> Verdict {
    if session.loading {
        return Verdict::Loading;
    }
    if !session.is_resolved() {
        return Verdict::Render;
    }
    if session.is_admin() {
        Verdict::Redirect(Route::AdminDashboard)
    } else if session.is_pending() {
        Verdict::Redirect(Route::PendingApproval)
    } else if session.is_active() && !session.has_profile() {
        Verdict::Redirect(Route::CreateProfile)
    } else if session.is_active() {
        Verdict::Redirect(Route::Browse)
    } else {
        Verdict::Render
    }
}

/// Evaluate whatever guard `route` declares.
#[must_use]
pub fn evaluate(session: &SessionSnapshot, route: &Route) -> Verdict {
    match route.access() {
        Access::PublicOnly => public_only(session),
        Access::Protected(caps) => protected(session, caps, route),
        Access::Redirect(target) => Verdict::Redirect(target),
        Access::Open => Verdict::Render,
    }
}
