//! Where a freshly signed-in account lands.

use crate::error::AuthError;
use crate::route::Route;
use crate::types::{AccountStatus, VerifySummary};

/// Resolve the landing route from the backend's verification summary.
///
/// # Errors
///
/// `AccountDisabled` for suspended or banned accounts. The caller is
/// responsible for signing the identity out.
pub fn landing_route(summary: &VerifySummary) -> Result<Route, AuthError> {
    match summary.status {
        AccountStatus::Suspended | AccountStatus::Banned => Err(AuthError::AccountDisabled(summary.status)),
        AccountStatus::PendingApproval => Ok(Route::PendingApproval),
        AccountStatus::Active if summary.account_type.is_admin() => Ok(Route::AdminDashboard),
        AccountStatus::Active if summary.has_profile => Ok(Route::Browse),
        AccountStatus::Active => Ok(Route::CreateProfile),
    }
}
