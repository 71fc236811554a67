//! Router tests over the in-memory store and lock.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header::CONTENT_TYPE},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tally_api::{AppState, create_router};
use tally_core::LedgerPolicy;
use tally_core::lock::{InMemoryLockManager, LockTimeouts};
use tally_core::store::InMemoryLedgerStore;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    store: Arc<InMemoryLedgerStore>,
}

fn app() -> TestApp {
    let store = Arc::new(InMemoryLedgerStore::new());
    let state = AppState::new(
        store.clone(),
        Arc::new(InMemoryLockManager::new()),
        LedgerPolicy::default(),
        LockTimeouts::default(),
    );
    TestApp {
        router: create_router(state),
        store,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn post(router: &Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(router, request).await
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(router, request).await
}

async fn open_account(app: &TestApp, user_id: i64, balance: i64) -> String {
    let (status, body) = post(
        &app.router,
        "/api/v1/account/create",
        &json!({ "userId": user_id, "initialBalance": balance }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["accountNumber"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let (status, body) = get(&app.router, "/api/v1/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_create_and_list_accounts() {
    let app = app();
    let user = app.store.add_user("kim").await.id.into_inner();

    let (status, body) = post(
        &app.router,
        "/api/v1/account/create",
        &json!({ "userId": user, "initialBalance": 2000 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["userId"], user);
    let number = body["accountNumber"].as_str().unwrap();
    assert_eq!(number.len(), 10);
    assert!(body["registeredAt"].is_string());

    let (status, body) = get(&app.router, &format!("/api/v1/account?userId={user}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([{ "accountNumber": number, "balance": 2000 }])
    );
}

#[tokio::test]
async fn test_create_validates_fields() {
    let app = app();
    let (status, body) = post(
        &app.router,
        "/api/v1/account/create",
        &json!({ "userId": 0, "initialBalance": 50 }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
    let reasons = body["reasons"].as_object().unwrap();
    assert_eq!(reasons.len(), 2);
    assert!(reasons.contains_key("userId"));
    assert!(reasons.contains_key("initialBalance"));
}

#[tokio::test]
async fn test_unknown_user_is_not_found() {
    let app = app();
    let (status, body) = post(
        &app.router,
        "/api/v1/account/create",
        &json!({ "userId": 42, "initialBalance": 1000 }),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "USER_NOT_FOUND");
    assert!(body["reasons"]["userId"].is_string());
}

#[tokio::test]
async fn test_user_without_accounts_is_not_found() {
    let app = app();
    let user = app.store.add_user("kim").await.id.into_inner();

    let (status, body) = get(&app.router, &format!("/api/v1/account?userId={user}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "ACCOUNT_NOT_FOUND");
}

#[tokio::test]
async fn test_delete_account_with_balance_is_rejected() {
    let app = app();
    let user = app.store.add_user("kim").await.id.into_inner();
    let number = open_account(&app, user, 1000).await;

    let (status, body) = post(
        &app.router,
        "/api/v1/account/delete",
        &json!({ "userId": user, "accountNumber": number }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ACCOUNT_HAS_BALANCE");
    assert!(body["reasons"]["account"].is_string());
}

#[tokio::test]
async fn test_use_cancel_and_lookup() {
    let app = app();
    let user = app.store.add_user("kim").await.id.into_inner();
    let number = open_account(&app, user, 2000).await;

    let (status, used) = post(
        &app.router,
        "/api/v1/transaction/use",
        &json!({ "userId": user, "accountNumber": number, "amount": 100 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{used}");
    assert_eq!(used["accountNumber"], number.as_str());
    assert_eq!(used["transactionResult"], "SUCCESS");
    assert_eq!(used["amount"], 100);
    let used_id = used["transactionId"].as_str().unwrap().to_string();

    let (status, found) = get(&app.router, &format!("/api/v1/transaction/{used_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["transactionType"], "USE");
    assert_eq!(found["balanceSnapshot"], 1900);

    let cancel = json!({ "transactionId": used_id, "accountNumber": number, "amount": 100 });
    let (status, canceled) = post(&app.router, "/api/v1/transaction/cancel", &cancel).await;
    assert_eq!(status, StatusCode::OK, "{canceled}");
    assert_eq!(canceled["transactionResult"], "SUCCESS");
    assert_ne!(canceled["transactionId"], used_id.as_str());

    let (status, again) = post(&app.router, "/api/v1/transaction/cancel", &cancel).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(again["error"], "TRANSACTION_FAILED");
    assert!(again["reasons"]["transaction"].is_string());

    let (status, list) = get(&app.router, &format!("/api/v1/account?userId={user}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list[0]["balance"], 2000);
}

#[tokio::test]
async fn test_use_over_balance_is_transaction_failed() {
    let app = app();
    let user = app.store.add_user("kim").await.id.into_inner();
    let number = open_account(&app, user, 100).await;

    let (status, body) = post(
        &app.router,
        "/api/v1/transaction/use",
        &json!({ "userId": user, "accountNumber": number, "amount": 500 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "TRANSACTION_FAILED");

    // the failed attempt is on record
    let (status, history) = get(
        &app.router,
        &format!("/api/v1/account/{number}/transactions"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["meta"]["total"], 1);
    assert_eq!(history["data"][0]["transactionResult"], "FAIL");
    assert_eq!(history["data"][0]["balanceSnapshot"], 100);
}

#[tokio::test]
async fn test_use_validates_amount_and_number() {
    let app = app();
    let (status, body) = post(
        &app.router,
        "/api/v1/transaction/use",
        &json!({ "userId": 1, "accountNumber": "12345", "amount": 5 }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let reasons = body["reasons"].as_object().unwrap();
    assert!(reasons.contains_key("accountNumber"));
    assert!(reasons.contains_key("amount"));
}

#[tokio::test]
async fn test_non_digit_account_number_is_rejected() {
    let app = app();
    let (status, body) = post(
        &app.router,
        "/api/v1/transaction/use",
        &json!({ "userId": 1, "accountNumber": "12345abcde", "amount": 100 }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["reasons"]["accountNumber"].is_string());
}

#[tokio::test]
async fn test_unknown_transaction_is_not_found() {
    let app = app();
    let (status, body) = get(&app.router, "/api/v1/transaction/missing").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "TRANSACTION_NOT_FOUND");
}

#[tokio::test]
async fn test_history_rejects_bad_limit() {
    let app = app();
    let (status, body) = get(
        &app.router,
        "/api/v1/account/1234567890/transactions?limit=500",
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["reasons"]["limit"].is_string());
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let app = app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/account/create")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app.router, request).await;

    assert!(status.is_client_error());
    assert_eq!(body["error"], "MALFORMED_REQUEST");
}
