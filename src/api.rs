//! Typed backend endpoints on top of the authenticated transport.
//!
//! The traits are the seams the session store, flows and notification
//! synchronizer depend on; `BackendApi` is the HTTP implementation.

use std::sync::Arc;

use serde_json::json;

use crate::error::TransportError;
use crate::transport::{ApiRequest, Transport};
use crate::types::{
    Envelope, MeResponse, NotificationItem, NotificationListResponse, ProfileRecord, RegisterRequest,
    UnreadCountResponse, VerifySummary,
};

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;

/// Account and profile endpoints.
#[async_trait::async_trait]
pub trait AccountApi: Send + Sync {
    /// `GET /auth/me`
    async fn me(&self) -> Result<MeResponse, TransportError>;

    /// `GET /profiles/me`; a missing profile is `Ok(None)`.
    async fn my_profile(&self) -> Result<Option<ProfileRecord>, TransportError>;

    /// `POST /auth/verify` with the provider's id token.
    async fn verify(&self, id_token: &str) -> Result<VerifySummary, TransportError>;

    /// `POST /auth/validate-invite`
    async fn validate_invite(&self, code: &str) -> Result<(), TransportError>;

    /// `POST /auth/register`
    async fn register(&self, request: &RegisterRequest) -> Result<(), TransportError>;
}

/// Notification endpoints.
#[async_trait::async_trait]
pub trait NotificationApi: Send + Sync {
    /// `GET /notifications/unread-count`
    async fn unread_count(&self) -> Result<u32, TransportError>;

    /// `GET /notifications`
    async fn list(&self) -> Result<Vec<NotificationItem>, TransportError>;

    /// `PATCH /notifications/:id/read`
    async fn mark_read(&self, id: &str) -> Result<(), TransportError>;

    /// `PATCH /notifications/read-all`
    async fn mark_all_read(&self) -> Result<(), TransportError>;

    /// `DELETE /notifications/:id`
    async fn delete(&self, id: &str) -> Result<(), TransportError>;
}

pub struct BackendApi {
    transport: Arc<Transport>,
}

impl BackendApi {
    #[must_use]
    pub fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait::async_trait]
impl AccountApi for BackendApi {
    async fn me(&self) -> Result<MeResponse, TransportError> {
        let envelope: Envelope<MeResponse> = self.transport.send_json(&ApiRequest::get("/auth/me")).await?;
        envelope.into_data()
    }

    async fn my_profile(&self) -> Result<Option<ProfileRecord>, TransportError> {
        match self
            .transport
            .send_json::<Envelope<ProfileRecord>>(&ApiRequest::get("/profiles/me"))
            .await
        {
            Ok(envelope) => envelope.into_optional(),
            Err(TransportError::Status { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn verify(&self, id_token: &str) -> Result<VerifySummary, TransportError> {
        let request = ApiRequest::post("/auth/verify", json!({ "idToken": id_token }));
        let envelope: Envelope<VerifySummary> = self.transport.send_json(&request).await?;
        envelope.into_data()
    }

    async fn validate_invite(&self, code: &str) -> Result<(), TransportError> {
        let request = ApiRequest::post("/auth/validate-invite", json!({ "code": code }));
        self.transport.send(&request).await?;
        Ok(())
    }

    async fn register(&self, request: &RegisterRequest) -> Result<(), TransportError> {
        let body = serde_json::to_value(request).map_err(|e| TransportError::Decode(e.to_string()))?;
        self.transport.send(&ApiRequest::post("/auth/register", body)).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl NotificationApi for BackendApi {
    async fn unread_count(&self) -> Result<u32, TransportError> {
        let response: UnreadCountResponse = self
            .transport
            .send_json(&ApiRequest::get("/notifications/unread-count"))
            .await?;
        Ok(response.count)
    }

    async fn list(&self) -> Result<Vec<NotificationItem>, TransportError> {
        let response: NotificationListResponse = self.transport.send_json(&ApiRequest::get("/notifications")).await?;
        Ok(response.notifications)
    }

    async fn mark_read(&self, id: &str) -> Result<(), TransportError> {
        self.transport
            .send(&ApiRequest::patch(format!("/notifications/{id}/read")))
            .await?;
        Ok(())
    }

    async fn mark_all_read(&self) -> Result<(), TransportError> {
        self.transport.send(&ApiRequest::patch("/notifications/read-all")).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), TransportError> {
        self.transport
            .send(&ApiRequest::delete(format!("/notifications/{id}")))
            .await?;
        Ok(())
    }
}
