//! Authenticated HTTP transport to the backend.
//!
//! ARCHITECTURE
//! ============
//! Every request carries the identity's cached bearer token (no forced
//! refresh) and an `X-Request-Id`. A 401 on the first attempt forces one
//! token refresh and a single replay under the same request id; the attempt
//! number travels with the request so a replay can never trigger another
//! replay.
//!
//! TRADE-OFFS
//! ==========
//! A 401 on the replay means the token itself is not the problem; the
//! session is terminated rather than looping. Non-idempotent requests are
//! replayed too: the backend rejected the first attempt before acting on it.

use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::config::HttpTimeouts;
use crate::error::{AuthError, TransportError};

#[cfg(test)]
#[path = "transport_test.rs"]
mod tests;

pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

// =============================================================================
// TOKEN SOURCE
// =============================================================================

/// Where the transport gets bearer tokens from.
#[async_trait::async_trait]
pub trait TokenSource: Send + Sync {
    /// Token to attach without refreshing, if an identity is live.
    fn cached_token(&self) -> Option<String>;

    /// Force a new token after `stale` was rejected.
    async fn refreshed_token(&self, stale: &str) -> Result<String, AuthError>;

    /// End the session after an unrecoverable 401.
    fn terminate(&self, reason: &str);
}

// =============================================================================
// REQUEST
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    First,
    Replay,
}

impl std::fmt::Display for Attempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::First => "first",
            Self::Replay => "replay",
        })
    }
}

/// One logical request. Replays reuse the same value.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
    pub request_id: Uuid,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), body: None, request_id: Uuid::new_v4() }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    #[must_use]
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    #[must_use]
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Successful (2xx) response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    /// Decode the body.
    ///
    /// # Errors
    ///
    /// `Decode` if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TransportError> {
        serde_json::from_str(&self.body).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

// =============================================================================
// TRANSPORT
// =============================================================================

pub struct Transport {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenSource>,
}

impl Transport {
    /// # Errors
    ///
    /// `HttpClientBuild` if the HTTP client cannot be constructed.
    pub fn new(base_url: &str, timeouts: HttpTimeouts, tokens: Arc<dyn TokenSource>) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(timeouts.request())
            .connect_timeout(timeouts.connect())
            .build()
            .map_err(|e| TransportError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_owned(), tokens })
    }

    /// Send with the 401 → refresh → single replay policy.
    ///
    /// # Errors
    ///
    /// - `Unauthorized`: 401 with no identity, or 401 on the replay (session
    ///   terminated in the latter case)
    /// - `SessionExpired`: the forced refresh failed (session terminated)
    /// - `Status`/`Network`: passed through untouched
    pub async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let mut attempt = Attempt::First;
        let mut token = self.tokens.cached_token();

        loop {
            let response = self.dispatch(request, token.as_deref(), attempt).await?;
            if response.status != 401 {
                return finish(response);
            }

            match (attempt, token) {
                (Attempt::First, Some(stale)) => match self.tokens.refreshed_token(&stale).await {
                    Ok(fresh) => {
                        debug!(request_id = %request.request_id, "token refreshed; replaying request");
                        token = Some(fresh);
                        attempt = Attempt::Replay;
                    }
                    Err(e) => {
                        error!(request_id = %request.request_id, error = %e, "token refresh failed after 401");
                        self.tokens.terminate("token refresh failed");
                        return Err(TransportError::SessionExpired(e.to_string()));
                    }
                },
                (Attempt::First, None) => return Err(TransportError::Unauthorized),
                (Attempt::Replay, _) => {
                    error!(request_id = %request.request_id, path = %request.path, "replay rejected with 401");
                    self.tokens.terminate("refreshed token rejected");
                    return Err(TransportError::Unauthorized);
                }
            }
        }
    }

    /// Send and decode a JSON body.
    ///
    /// # Errors
    ///
    /// See [`Transport::send`]; plus `Decode` on schema mismatch.
    pub async fn send_json<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, TransportError> {
        self.send(request).await?.json()
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
        attempt: Attempt,
    ) -> Result<ApiResponse, TransportError> {
        let url = format!("{}/{}", self.base_url, request.path.trim_start_matches('/'));
        debug!(
            request_id = %request.request_id,
            method = %request.method,
            path = %request.path,
            %attempt,
            authenticated = token.is_some(),
            "dispatching request"
        );

        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .header(REQUEST_ID_HEADER, request.request_id.to_string());
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            warn!(request_id = %request.request_id, error = %e, "request failed");
            TransportError::Network(e.to_string())
        })?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(ApiResponse { status, body })
    }
}

fn finish(response: ApiResponse) -> Result<ApiResponse, TransportError> {
    if (200..300).contains(&response.status) {
        Ok(response)
    } else {
        Err(TransportError::Status { status: response.status, body: response.body })
    }
}
