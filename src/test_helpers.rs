//! In-memory provider and backend doubles shared by unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crate::api::{AccountApi, NotificationApi};
use crate::error::TransportError;
use crate::identity::verifier::{Verifier, VerifierSource};
use crate::identity::{IdentityCredential, IdentityProvider, PendingChallenge, ProviderError};
use crate::types::{
    AccountStatus, AccountType, MeResponse, NotificationItem, NotificationKind, ProfileRecord, RegisterRequest,
    UserRecord, VerifySummary,
};

pub const GOOD_CODE: &str = "123456";
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "secret";

// =============================================================================
// PROVIDER
// =============================================================================

/// Answers every attempt with a token derived from its nonce.
pub struct NonceVerifier;

#[async_trait::async_trait]
impl VerifierSource for NonceVerifier {
    async fn solve(&self, verifier: &Verifier) -> Result<String, ProviderError> {
        Ok(format!("solved-{}", verifier.nonce()))
    }
}

/// Provider double. Tokens are `"{uid}-token-{generation}"`.
#[derive(Default)]
pub struct MockProvider {
    pub sends: Mutex<Vec<(String, String)>>,
    pub refresh_calls: AtomicUsize,
    pub sign_out_calls: AtomicUsize,
    pub rate_limited: AtomicBool,
    pub revoked: AtomicBool,
    pub fail_sign_out: AtomicBool,
    /// Artificial latency on refresh, for single-flight tests.
    pub refresh_delay: Mutex<Option<Duration>>,
    generation: AtomicUsize,
}

impl MockProvider {
    pub fn credential(uid: &str, generation: usize) -> IdentityCredential {
        IdentityCredential {
            uid: uid.to_owned(),
            id_token: format!("{uid}-token-{generation}"),
            refresh_token: format!("{uid}-refresh"),
            phone_number: None,
            email: None,
        }
    }
}

#[async_trait::async_trait]
impl IdentityProvider for MockProvider {
    async fn send_verification_code(
        &self,
        phone_e164: &str,
        verifier_token: &str,
    ) -> Result<PendingChallenge, ProviderError> {
        self.sends
            .lock()
            .unwrap()
            .push((phone_e164.to_owned(), verifier_token.to_owned()));
        if self.rate_limited.load(Ordering::SeqCst) {
            return Err(ProviderError::RateLimited);
        }
        Ok(PendingChallenge { verification_id: format!("session-{phone_e164}"), phone_number: phone_e164.to_owned() })
    }

    async fn confirm_code(&self, challenge: &PendingChallenge, code: &str) -> Result<IdentityCredential, ProviderError> {
        if code != GOOD_CODE {
            return Err(ProviderError::InvalidCode);
        }
        let mut credential = Self::credential(&format!("uid{}", challenge.phone_number), 0);
        credential.phone_number = Some(challenge.phone_number.clone());
        Ok(credential)
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<IdentityCredential, ProviderError> {
        if email != ADMIN_EMAIL || password != ADMIN_PASSWORD {
            return Err(ProviderError::InvalidCredentials);
        }
        let mut credential = Self::credential("uid-admin", 0);
        credential.email = Some(email.to_owned());
        Ok(credential)
    }

    async fn refresh(&self, credential: &IdentityCredential) -> Result<IdentityCredential, ProviderError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.refresh_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.revoked.load(Ordering::SeqCst) {
            return Err(ProviderError::SessionRevoked("TOKEN_EXPIRED".into()));
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut fresh = Self::credential(&credential.uid, generation);
        fresh.phone_number.clone_from(&credential.phone_number);
        fresh.email.clone_from(&credential.email);
        Ok(fresh)
    }

    async fn sign_out(&self, _credential: &IdentityCredential) -> Result<(), ProviderError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(ProviderError::Request("network down".into()));
        }
        Ok(())
    }
}

// =============================================================================
// BACKEND
// =============================================================================

/// Backend double. `user == None` means the phone is not registered.
#[derive(Default)]
pub struct MockBackend {
    pub user: Mutex<Option<UserRecord>>,
    pub profile: Mutex<Option<ProfileRecord>>,
    pub invites: Mutex<Vec<String>>,
    pub registrations: Mutex<Vec<RegisterRequest>>,
    pub notifications: Mutex<Vec<NotificationItem>>,
    pub me_calls: AtomicUsize,
    pub verify_calls: AtomicUsize,
    pub unread_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub fail_me: AtomicBool,
    pub fail_mutations: AtomicBool,
    /// Latency on `me`, for stale-response tests.
    pub me_delay: Mutex<Option<Duration>>,
    /// Latency on notification reads. The answer is taken before the wait.
    pub notify_delay: Mutex<Option<Duration>>,
}

impl MockBackend {
    pub fn with_user(user: UserRecord) -> Self {
        let backend = Self::default();
        *backend.user.lock().unwrap() = Some(user);
        backend
    }

    pub fn set_status(&self, status: AccountStatus) {
        if let Some(user) = self.user.lock().unwrap().as_mut() {
            user.status = status;
        }
    }

    pub fn set_notifications(&self, items: Vec<NotificationItem>) {
        *self.notifications.lock().unwrap() = items;
    }

    async fn notify_latency(&self) {
        let delay = *self.notify_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn unavailable() -> TransportError {
        TransportError::Status { status: 503, body: r#"{"message":"Service unavailable"}"#.into() }
    }
}

#[async_trait::async_trait]
impl AccountApi for MockBackend {
    async fn me(&self) -> Result<MeResponse, TransportError> {
        self.me_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.me_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_me.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        let user = self.user.lock().unwrap().clone().ok_or(TransportError::Status {
            status: 404,
            body: r#"{"message":"User not found"}"#.into(),
        })?;
        Ok(MeResponse { user, profile: self.profile.lock().unwrap().clone() })
    }

    async fn my_profile(&self) -> Result<Option<ProfileRecord>, TransportError> {
        if self.fail_me.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(self.profile.lock().unwrap().clone())
    }

    async fn verify(&self, _id_token: &str) -> Result<VerifySummary, TransportError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        let user = self.user.lock().unwrap().clone().ok_or(TransportError::Status {
            status: 404,
            body: r#"{"success":false,"error":"User not found","requiresRegistration":true}"#.into(),
        })?;
        Ok(VerifySummary {
            account_type: user.account_type,
            status: user.status,
            has_profile: self.profile.lock().unwrap().is_some(),
        })
    }

    async fn validate_invite(&self, code: &str) -> Result<(), TransportError> {
        if self.invites.lock().unwrap().iter().any(|c| c == code) {
            Ok(())
        } else {
            Err(TransportError::Status { status: 400, body: r#"{"message":"Invite code has expired"}"#.into() })
        }
    }

    async fn register(&self, request: &RegisterRequest) -> Result<(), TransportError> {
        self.registrations.lock().unwrap().push(request.clone());
        *self.user.lock().unwrap() = Some(UserRecord {
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            ..user("acc-new", AccountType::User, AccountStatus::Active)
        });
        Ok(())
    }
}

#[async_trait::async_trait]
impl NotificationApi for MockBackend {
    async fn unread_count(&self) -> Result<u32, TransportError> {
        self.unread_calls.fetch_add(1, Ordering::SeqCst);
        let count = {
            let items = self.notifications.lock().unwrap();
            u32::try_from(items.iter().filter(|n| !n.is_read).count()).unwrap_or(u32::MAX)
        };
        self.notify_latency().await;
        Ok(count)
    }

    async fn list(&self) -> Result<Vec<NotificationItem>, TransportError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let items = self.notifications.lock().unwrap().clone();
        self.notify_latency().await;
        Ok(items)
    }

    async fn mark_read(&self, id: &str) -> Result<(), TransportError> {
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        for item in self.notifications.lock().unwrap().iter_mut().filter(|n| n.id == id) {
            item.is_read = true;
        }
        Ok(())
    }

    async fn mark_all_read(&self) -> Result<(), TransportError> {
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        for item in self.notifications.lock().unwrap().iter_mut() {
            item.is_read = true;
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), TransportError> {
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.notifications.lock().unwrap().retain(|n| n.id != id);
        Ok(())
    }
}

// =============================================================================
// FIXTURES
// =============================================================================

pub fn user(account_id: &str, account_type: AccountType, status: AccountStatus) -> UserRecord {
    UserRecord {
        account_id: account_id.to_owned(),
        first_name: "Amaka".into(),
        last_name: "Obi".into(),
        phone_number: Some("+2348012345678".into()),
        phone_verified: true,
        account_type,
        status,
    }
}

pub fn profile(id: &str) -> ProfileRecord {
    ProfileRecord { id: id.to_owned(), status: Some("approved".into()), fields: serde_json::Map::new() }
}

pub fn notification(id: &str, kind: NotificationKind, is_read: bool) -> NotificationItem {
    NotificationItem {
        id: id.to_owned(),
        kind,
        title: format!("title {id}"),
        message: format!("message {id}"),
        is_read,
        created_at: None,
        data: serde_json::Value::Null,
    }
}
