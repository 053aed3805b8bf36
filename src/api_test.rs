use super::*;

use std::sync::Mutex;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde_json::Value;

use crate::config::HttpTimeouts;
use crate::error::AuthError;
use crate::transport::TokenSource;
use crate::types::{AccountStatus, AccountType, NotificationKind};

#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<String>>,
    bodies: Mutex<Vec<Value>>,
}

impl Recorder {
    fn call(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

type Shared = State<Arc<Recorder>>;

async fn me(State(r): Shared) -> Json<Value> {
    r.call("GET /auth/me");
    Json(json!({
        "success": true,
        "data": {
            "user": {
                "id": "acc-1",
                "firstName": "Amaka",
                "lastName": "Obi",
                "accountType": "user",
                "status": "active"
            },
            "profile": null
        }
    }))
}

async fn profile_missing(State(r): Shared) -> (StatusCode, Json<Value>) {
    r.call("GET /profiles/me");
    (StatusCode::NOT_FOUND, Json(json!({ "message": "Profile not found" })))
}

async fn verify(State(r): Shared, Json(body): Json<Value>) -> Json<Value> {
    r.call("POST /auth/verify");
    let refused = body["idToken"] == "refused-token";
    r.bodies.lock().unwrap().push(body);
    if refused {
        return Json(json!({ "success": false, "message": "Account lookup failed" }));
    }
    Json(json!({
        "success": true,
        "data": { "accountType": "super_admin", "status": "active", "hasProfile": false }
    }))
}

async fn register(State(r): Shared, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    r.call("POST /auth/register");
    r.bodies.lock().unwrap().push(body);
    (StatusCode::CREATED, Json(json!({ "success": true })))
}

async fn invite(State(r): Shared, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    r.call("POST /auth/validate-invite");
    if body["code"] == "GOODCODE" {
        (StatusCode::OK, Json(json!({ "success": true })))
    } else {
        (StatusCode::BAD_REQUEST, Json(json!({ "message": "Invalid invite code" })))
    }
}

async fn unread(State(r): Shared) -> Json<Value> {
    r.call("GET /notifications/unread-count");
    Json(json!({ "count": 3 }))
}

async fn list(State(r): Shared) -> Json<Value> {
    r.call("GET /notifications");
    Json(json!({
        "notifications": [
            { "id": "n1", "type": "new_match", "title": "Match", "message": "m", "isRead": false, "data": { "matchId": "m1" } },
            { "id": "n2", "type": "brand_new_kind", "isRead": true }
        ]
    }))
}

async fn read_one(State(r): Shared, Path(id): Path<String>) -> StatusCode {
    r.call(format!("PATCH /notifications/{id}/read"));
    StatusCode::OK
}

async fn read_all(State(r): Shared) -> StatusCode {
    r.call("PATCH /notifications/read-all");
    StatusCode::OK
}

async fn delete_one(State(r): Shared, Path(id): Path<String>) -> StatusCode {
    r.call(format!("DELETE /notifications/{id}"));
    StatusCode::NO_CONTENT
}

struct FixedToken;

#[async_trait::async_trait]
impl TokenSource for FixedToken {
    fn cached_token(&self) -> Option<String> {
        Some("tok".into())
    }

    async fn refreshed_token(&self, _stale: &str) -> Result<String, AuthError> {
        Err(AuthError::SessionExpired("fixed".into()))
    }

    fn terminate(&self, _reason: &str) {}
}

async fn api() -> (BackendApi, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let app = Router::new()
        .route("/api/auth/me", get(me))
        .route("/api/profiles/me", get(profile_missing))
        .route("/api/auth/verify", post(verify))
        .route("/api/auth/register", post(register))
        .route("/api/auth/validate-invite", post(invite))
        .route("/api/notifications/unread-count", get(unread))
        .route("/api/notifications", get(list))
        .route("/api/notifications/read-all", patch(read_all))
        .route("/api/notifications/{id}/read", patch(read_one))
        .route("/api/notifications/{id}", axum::routing::delete(delete_one))
        .with_state(recorder.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let transport = Transport::new(&format!("http://{addr}/api"), HttpTimeouts::default(), Arc::new(FixedToken)).unwrap();
    (BackendApi::new(Arc::new(transport)), recorder)
}

#[tokio::test]
async fn me_unwraps_envelope() {
    let (api, _) = api().await;
    let me = api.me().await.unwrap();
    assert_eq!(me.user.account_id, "acc-1");
    assert_eq!(me.user.status, AccountStatus::Active);
    assert!(me.profile.is_none());
}

#[tokio::test]
async fn missing_profile_is_none() {
    let (api, recorder) = api().await;
    assert!(api.my_profile().await.unwrap().is_none());
    assert_eq!(recorder.calls.lock().unwrap().as_slice(), ["GET /profiles/me"]);
}

#[tokio::test]
async fn verify_posts_id_token() {
    let (api, recorder) = api().await;
    let summary = api.verify("provider-token").await.unwrap();
    assert_eq!(summary.account_type, AccountType::SuperAdmin);
    assert!(!summary.has_profile);
    assert_eq!(recorder.bodies.lock().unwrap()[0], json!({ "idToken": "provider-token" }));
}

#[tokio::test]
async fn unsuccessful_envelope_with_ok_status_is_an_error() {
    let (api, _) = api().await;

    let err = api.verify("refused-token").await.unwrap_err();

    assert!(matches!(&err, TransportError::Unsuccessful(m) if m == "Account lookup failed"));
    assert!(matches!(AuthError::from(err), AuthError::BackendUnavailable(_)));
}

#[tokio::test]
async fn register_sends_camel_case_body() {
    let (api, recorder) = api().await;
    let request = RegisterRequest {
        id_token: "t".into(),
        invite_code: "GOODCODE".into(),
        first_name: "Amaka".into(),
        last_name: "Obi".into(),
    };
    api.register(&request).await.unwrap();
    assert_eq!(
        recorder.bodies.lock().unwrap()[0],
        json!({ "idToken": "t", "inviteCode": "GOODCODE", "firstName": "Amaka", "lastName": "Obi" })
    );
}

#[tokio::test]
async fn invalid_invite_is_status_error_with_message() {
    let (api, _) = api().await;
    api.validate_invite("GOODCODE").await.unwrap();
    let err = api.validate_invite("BADCODE1").await.unwrap_err();
    assert_eq!(err.status(), Some(400));
    let body = crate::types::BackendErrorBody::parse(err.body().unwrap());
    assert_eq!(body.message(), Some("Invalid invite code"));
}

#[tokio::test]
async fn notification_endpoints() {
    let (api, recorder) = api().await;

    assert_eq!(api.unread_count().await.unwrap(), 3);
    let items = api.list().await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].kind, NotificationKind::NewMatch);
    assert_eq!(items[1].kind, NotificationKind::Unknown);

    api.mark_read("n1").await.unwrap();
    api.mark_all_read().await.unwrap();
    api.delete("n2").await.unwrap();

    assert_eq!(
        recorder.calls.lock().unwrap().as_slice(),
        [
            "GET /notifications/unread-count",
            "GET /notifications",
            "PATCH /notifications/n1/read",
            "PATCH /notifications/read-all",
            "DELETE /notifications/n2",
        ]
    );
}
