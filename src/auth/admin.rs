//! Email/password sign-in for the admin console.

use tracing::{info, warn};

use crate::error::AuthError;
use crate::identity::IdentityGateway;
use crate::route::Route;
use crate::types::AccountStatus;

/// Sign an administrator in and return the dashboard route.
///
/// # Errors
///
/// - `Validation`: blank email or password
/// - `Rejected`: bad credentials
/// - `AccessDenied`: the account is not an admin; the identity is signed out
/// - `AccountDisabled`: the admin is not active; the identity is signed out
pub async fn admin_sign_in(gateway: &IdentityGateway, email: &str, password: &str) -> Result<Route, AuthError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(AuthError::Validation("enter your email and password"));
    }

    let summary = gateway.sign_in_with_password(email, password).await?;

    if !summary.account_type.is_admin() {
        warn!(account_type = ?summary.account_type, "admin sign-in refused for non-admin account");
        gateway.end_session("admin access denied").await;
        return Err(AuthError::AccessDenied);
    }
    if summary.status != AccountStatus::Active {
        warn!(status = ?summary.status, "admin sign-in refused for inactive account");
        gateway.end_session("admin account inactive").await;
        return Err(AuthError::AccountDisabled(summary.status));
    }

    info!(account_type = ?summary.account_type, "admin signed in");
    Ok(Route::AdminDashboard)
}
