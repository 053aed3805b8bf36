use super::*;

use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::identity::IdentitySession;
use crate::test_helpers::{GOOD_CODE, MockBackend, MockProvider, NonceVerifier};

struct Harness {
    backend: Arc<MockBackend>,
    store: Arc<SessionStore>,
    registration: Registration,
    _task: JoinHandle<()>,
}

fn harness() -> Harness {
    let backend = Arc::new(MockBackend::default());
    backend.invites.lock().unwrap().push("ABCD1234".into());
    let identity = Arc::new(IdentitySession::new(Arc::new(MockProvider::default()), None));
    let gateway = Arc::new(IdentityGateway::new(identity.clone(), backend.clone(), Arc::new(NonceVerifier), "+234"));
    let store = Arc::new(SessionStore::new(identity, backend.clone()));
    let task = store.spawn();
    let registration = Registration::new(gateway, store.clone());
    Harness { backend, store, registration, _task: task }
}

async fn at_details(h: &mut Harness) {
    h.registration.validate_invite("abcd1234").await.unwrap();
    h.registration.send_code("08012345678").await.unwrap();
    h.registration.confirm_code(GOOD_CODE).await.unwrap();
}

#[tokio::test]
async fn full_flow_lands_on_create_profile() {
    let mut h = harness();
    at_details(&mut h).await;
    assert_eq!(h.registration.step(), RegistrationStep::Details);
    assert_eq!(h.backend.verify_calls.load(Ordering::SeqCst), 0);

    let route = h.registration.register(" Chidi ", "Okeke").await.unwrap();

    assert_eq!(route, Route::CreateProfile);
    assert_eq!(h.registration.step(), RegistrationStep::Done);

    let sent = h.backend.registrations.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].invite_code, "ABCD1234");
    assert_eq!(sent[0].first_name, "Chidi");
    assert_eq!(sent[0].id_token, "uid+2348012345678-token-0");

    let mut rx = h.store.subscribe();
    let snapshot = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| s.user.is_some()))
        .await
        .unwrap()
        .unwrap()
        .clone();
    assert!(snapshot.is_active());
    assert!(!snapshot.has_profile());
}

#[tokio::test]
async fn rejected_invite_shows_backend_message() {
    let mut h = harness();

    let err = h.registration.validate_invite("ZZZZ9999").await.unwrap_err();

    assert!(matches!(err, AuthError::Rejected(ref m) if m == "Invite code has expired"));
    assert_eq!(h.registration.step(), RegistrationStep::Invite);
}

#[tokio::test]
async fn malformed_invite_fails_locally() {
    let mut h = harness();
    assert!(matches!(h.registration.validate_invite("abc").await, Err(AuthError::Validation(_))));
}

#[tokio::test]
async fn steps_must_run_in_order() {
    let mut h = harness();

    assert!(matches!(h.registration.send_code("08012345678").await, Err(AuthError::InvalidState(_))));
    assert!(matches!(h.registration.confirm_code(GOOD_CODE).await, Err(AuthError::InvalidState(_))));
    assert!(matches!(h.registration.register("Chidi", "Okeke").await, Err(AuthError::InvalidState(_))));

    h.registration.validate_invite("ABCD1234").await.unwrap();
    assert!(matches!(h.registration.validate_invite("ABCD1234").await, Err(AuthError::InvalidState(_))));
}

#[tokio::test]
async fn bad_phone_fails_locally() {
    let mut h = harness();
    h.registration.validate_invite("ABCD1234").await.unwrap();

    assert!(matches!(h.registration.send_code("0601234567").await, Err(AuthError::Validation(_))));
    assert_eq!(h.registration.step(), RegistrationStep::Phone);
}

#[tokio::test]
async fn wrong_code_can_be_retried() {
    let mut h = harness();
    h.registration.validate_invite("ABCD1234").await.unwrap();
    h.registration.send_code("08012345678").await.unwrap();

    assert!(matches!(h.registration.confirm_code("000000").await, Err(AuthError::InvalidCode)));
    assert_eq!(h.registration.step(), RegistrationStep::Code);

    h.registration.send_code("08012345678").await.unwrap();
    h.registration.confirm_code(GOOD_CODE).await.unwrap();
    assert_eq!(h.registration.step(), RegistrationStep::Details);
}

#[tokio::test]
async fn invalid_names_fail_before_backend() {
    let mut h = harness();
    at_details(&mut h).await;

    assert!(matches!(h.registration.register("C", "Okeke").await, Err(AuthError::Validation(_))));
    assert!(matches!(h.registration.register("Chidi", "Ok3ke").await, Err(AuthError::Validation(_))));
    assert!(h.backend.registrations.lock().unwrap().is_empty());
    assert_eq!(h.registration.step(), RegistrationStep::Details);
}

#[test]
fn rejection_prefers_backend_message() {
    let err = rejection(
        TransportError::Status { status: 409, body: r#"{"error":"Phone already registered"}"#.into() },
        "fallback",
    );
    assert!(matches!(err, AuthError::Rejected(ref m) if m == "Phone already registered"));

    let err = rejection(TransportError::Status { status: 422, body: "not json".into() }, "fallback");
    assert!(matches!(err, AuthError::Rejected(ref m) if m == "fallback"));

    let err = rejection(TransportError::Status { status: 502, body: String::new() }, "fallback");
    assert!(matches!(err, AuthError::BackendUnavailable(_)));
}
