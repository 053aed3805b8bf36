//! Firebase Identity Toolkit REST client.
//!
//! Thin HTTP wrapper over `accounts:sendVerificationCode`,
//! `accounts:signInWithPhoneNumber`, `accounts:signInWithPassword` and the
//! secure-token refresh endpoint. Error mapping lives in `parse_error` for
//! testability.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use super::{IdentityCredential, IdentityProvider, PendingChallenge, ProviderError};
use crate::config::{HttpTimeouts, IdentityConfig};

#[cfg(test)]
#[path = "firebase_test.rs"]
mod tests;

// =============================================================================
// CLIENT
// =============================================================================

pub struct FirebaseProvider {
    http: reqwest::Client,
    api_key: Option<String>,
    identity_base_url: String,
    token_base_url: String,
}

impl FirebaseProvider {
    /// # Errors
    ///
    /// `Request` if the HTTP client cannot be constructed.
    pub fn new(config: &IdentityConfig, timeouts: HttpTimeouts) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(timeouts.request())
            .connect_timeout(timeouts.connect())
            .build()
            .map_err(|e| ProviderError::Request(e.to_string()))?;
        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            identity_base_url: config.identity_base_url.trim_end_matches('/').to_owned(),
            token_base_url: config.token_base_url.trim_end_matches('/').to_owned(),
        })
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.api_key
            .as_deref()
            .ok_or(ProviderError::NotConfigured("MATCHBOOK_IDENTITY_API_KEY"))
    }

    async fn accounts<T: DeserializeOwned>(&self, method: &str, body: serde_json::Value) -> Result<T, ProviderError> {
        let url = format!("{}/accounts:{method}", self.identity_base_url);
        debug!(%method, "identity provider call");
        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key()?)])
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;
        read_json(response).await
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ProviderError> {
    let status = response.status().as_u16();
    let text = response
        .text()
        .await
        .map_err(|e| ProviderError::Request(e.to_string()))?;
    if !(200..300).contains(&status) {
        return Err(parse_error(status, &text));
    }
    serde_json::from_str(&text).map_err(|e| ProviderError::Response { status, message: e.to_string() })
}

#[async_trait::async_trait]
impl IdentityProvider for FirebaseProvider {
    async fn send_verification_code(
        &self,
        phone_e164: &str,
        verifier_token: &str,
    ) -> Result<PendingChallenge, ProviderError> {
        let response: SendCodeResponse = self
            .accounts(
                "sendVerificationCode",
                json!({ "phoneNumber": phone_e164, "recaptchaToken": verifier_token }),
            )
            .await?;
        Ok(PendingChallenge { verification_id: response.session_info, phone_number: phone_e164.to_owned() })
    }

    async fn confirm_code(&self, challenge: &PendingChallenge, code: &str) -> Result<IdentityCredential, ProviderError> {
        let response: SignInResponse = self
            .accounts(
                "signInWithPhoneNumber",
                json!({ "sessionInfo": challenge.verification_id, "code": code }),
            )
            .await?;
        let mut credential = response.into_credential();
        if credential.phone_number.is_none() {
            credential.phone_number = Some(challenge.phone_number.clone());
        }
        Ok(credential)
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<IdentityCredential, ProviderError> {
        let response: SignInResponse = self
            .accounts(
                "signInWithPassword",
                json!({ "email": email, "password": password, "returnSecureToken": true }),
            )
            .await?;
        Ok(response.into_credential())
    }

    async fn refresh(&self, credential: &IdentityCredential) -> Result<IdentityCredential, ProviderError> {
        let url = format!("{}/token", self.token_base_url);
        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key()?)])
            .form(&[("grant_type", "refresh_token"), ("refresh_token", credential.refresh_token.as_str())])
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;
        let refreshed: RefreshResponse = read_json(response).await?;
        Ok(IdentityCredential {
            uid: refreshed.user_id,
            id_token: refreshed.id_token,
            refresh_token: refreshed.refresh_token,
            phone_number: credential.phone_number.clone(),
            email: credential.email.clone(),
        })
    }

    async fn sign_out(&self, _credential: &IdentityCredential) -> Result<(), ProviderError> {
        // The REST surface has no client-side revoke; dropping the tokens is
        // the sign-out.
        Ok(())
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendCodeResponse {
    session_info: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    id_token: String,
    refresh_token: String,
    local_id: String,
    #[serde(default)]
    phone_number: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

impl SignInResponse {
    fn into_credential(self) -> IdentityCredential {
        IdentityCredential {
            uid: self.local_id,
            id_token: self.id_token,
            refresh_token: self.refresh_token,
            phone_number: self.phone_number,
            email: self.email,
        }
    }
}

/// The secure-token endpoint answers in snake_case.
#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    user_id: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
}

// =============================================================================
// ERROR MAPPING
// =============================================================================

/// Map a provider error response to a typed error. The provider encodes the
/// reason as an upper-snake code at the start of `error.message`, optionally
/// followed by ` : detail`.
pub(crate) fn parse_error(status: u16, body: &str) -> ProviderError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_owned());
    let code = message.split(':').next().unwrap_or_default().trim().to_owned();

    match code.as_str() {
        "INVALID_PHONE_NUMBER" | "MISSING_PHONE_NUMBER" => ProviderError::InvalidPhoneNumber(message),
        "TOO_MANY_ATTEMPTS_TRY_LATER" | "QUOTA_EXCEEDED" => ProviderError::RateLimited,
        "CAPTCHA_CHECK_FAILED" | "INVALID_RECAPTCHA_TOKEN" | "MISSING_RECAPTCHA_TOKEN" => {
            ProviderError::VerifierRejected(message)
        }
        "INVALID_CODE" | "INVALID_SESSION_INFO" | "MISSING_CODE" => ProviderError::InvalidCode,
        "SESSION_EXPIRED" | "CODE_EXPIRED" => ProviderError::CodeExpired,
        "INVALID_PASSWORD" | "EMAIL_NOT_FOUND" | "INVALID_LOGIN_CREDENTIALS" | "INVALID_EMAIL" => {
            ProviderError::InvalidCredentials
        }
        "TOKEN_EXPIRED" | "USER_DISABLED" | "USER_NOT_FOUND" | "INVALID_REFRESH_TOKEN" | "INVALID_GRANT_TYPE" => {
            ProviderError::SessionRevoked(message)
        }
        _ => ProviderError::Response { status, message },
    }
}
