use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use tx_ingest::adapters::InMemoryTransactionStore;
use tx_ingest::services::SimulatedExternalCall;
use tx_ingest::{create_app, AppState};

struct TestApp {
    router: Router,
    store: InMemoryTransactionStore,
    external: Arc<SimulatedExternalCall>,
}

fn test_app(delay: Duration) -> TestApp {
    let store = InMemoryTransactionStore::new();
    let external = Arc::new(SimulatedExternalCall::new(delay));
    let state = AppState::new(Arc::new(store.clone()), external.clone(), 64);

    TestApp {
        router: create_app(state),
        store,
        external,
    }
}

fn payload(transaction_id: &str) -> Value {
    json!({
        "transaction_id": transaction_id,
        "source_account": "acc_user_001",
        "destination_account": "acc_merchant_001",
        "amount": 100.50,
        "currency": "USD"
    })
}

async fn post_webhook(app: &Router, body: String) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/webhooks/transactions")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    read_json(response).await
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    read_json(response).await
}

async fn read_json(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn wait_for_status(app: &Router, transaction_id: &str, expected: &str) -> Value {
    let uri = format!("/v1/transactions/{}", transaction_id);
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let (status, body) = get(app, &uri).await;
            if status == StatusCode::OK && body["status"] == expected {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("transaction did not reach expected status")
}

#[tokio::test]
async fn test_single_transaction_lifecycle() {
    let app = test_app(Duration::from_millis(100));

    let (status, ack) = post_webhook(&app.router, payload("txn_test_001").to_string()).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(ack["message"], "Webhook received and queued for processing");
    assert_eq!(ack["transaction_id"], "txn_test_001");

    let (status, record) = get(&app.router, "/v1/transactions/txn_test_001").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["status"], "PROCESSING");
    assert!(record["processed_at"].is_null());
    assert_eq!(record["source_account"], "acc_user_001");
    assert_eq!(record["destination_account"], "acc_merchant_001");
    assert_eq!(record["currency"], "USD");

    let done = wait_for_status(&app.router, "txn_test_001", "PROCESSED").await;
    let created = done["created_at"].as_str().unwrap();
    let processed = done["processed_at"].as_str().unwrap();
    assert!(created.ends_with('Z') && processed.ends_with('Z'));
    // Fixed-width UTC timestamps order lexicographically.
    assert!(processed >= created);
    assert_eq!(app.external.calls(), 1);
}

#[tokio::test]
async fn test_duplicate_delivery_is_accepted_once() {
    let app = test_app(Duration::from_millis(100));
    let body = payload("txn_duplicate_test").to_string();

    let (first, first_ack) = post_webhook(&app.router, body.clone()).await;
    let (second, second_ack) = post_webhook(&app.router, body).await;

    assert_eq!(first, StatusCode::ACCEPTED);
    assert_eq!(second, StatusCode::ACCEPTED);
    assert_eq!(first_ack["message"], "Webhook received and queued for processing");
    assert_eq!(second_ack["message"], "Transaction already being processed");
    assert_eq!(app.store.len(), 1);

    wait_for_status(&app.router, "txn_duplicate_test", "PROCESSED").await;
    assert_eq!(app.external.calls(), 1);

    let (third, third_ack) = post_webhook(&app.router, payload("txn_duplicate_test").to_string()).await;
    assert_eq!(third, StatusCode::ACCEPTED);
    assert_eq!(third_ack["message"], "Transaction already processed");
    assert_eq!(app.external.calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicates_dispatch_one_processor() {
    let app = test_app(Duration::from_millis(50));
    let body = payload("txn_concurrent").to_string();

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let router = app.router.clone();
            let body = body.clone();
            tokio::spawn(async move { post_webhook(&router, body).await })
        })
        .collect();

    let mut queued = 0;
    for handle in handles {
        let (status, ack) = handle.await.unwrap();
        assert_eq!(status, StatusCode::ACCEPTED);
        if ack["message"] == "Webhook received and queued for processing" {
            queued += 1;
        }
    }

    assert_eq!(queued, 1);
    assert_eq!(app.store.len(), 1);

    wait_for_status(&app.router, "txn_concurrent", "PROCESSED").await;
    assert_eq!(app.external.calls(), 1);
}

#[tokio::test]
async fn test_acceptance_does_not_wait_for_processing() {
    let app = test_app(Duration::from_secs(30));

    let (status, _) = tokio::time::timeout(
        Duration::from_secs(2),
        post_webhook(&app.router, payload("txn_slow").to_string()),
    )
    .await
    .expect("webhook blocked on the processor");
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, _) = tokio::time::timeout(
        Duration::from_secs(2),
        post_webhook(&app.router, payload("txn_slow").to_string()),
    )
    .await
    .expect("duplicate webhook blocked on the processor");
    assert_eq!(status, StatusCode::ACCEPTED);

    let (_, record) = get(&app.router, "/v1/transactions/txn_slow").await;
    assert_eq!(record["status"], "PROCESSING");
}

#[tokio::test]
async fn test_malformed_payloads_are_rejected() {
    let app = test_app(Duration::ZERO);

    let cases = [
        "{not json".to_string(),
        json!({ "transaction_id": "txn_bad" }).to_string(),
        json!({
            "transaction_id": "txn_bad",
            "source_account": "acc_user_001",
            "destination_account": "acc_merchant_001",
            "amount": "abc",
            "currency": "USD"
        })
        .to_string(),
        json!({
            "transaction_id": "txn_bad",
            "source_account": "acc_user_001",
            "destination_account": "acc_merchant_001",
            "amount": -5,
            "currency": "USD"
        })
        .to_string(),
        json!({
            "transaction_id": "",
            "source_account": "acc_user_001",
            "destination_account": "acc_merchant_001",
            "amount": 5,
            "currency": "USD"
        })
        .to_string(),
        json!({
            "transaction_id": "txn_bad",
            "source_account": "acc_user_001",
            "destination_account": "acc_merchant_001",
            "amount": 5,
            "currency": "DOLLARS"
        })
        .to_string(),
    ];

    for body in cases {
        let (status, error) = post_webhook(&app.router, body.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
        assert_eq!(error["status"], 400);
        assert!(error["error"].as_str().unwrap().starts_with("Validation error"));
    }

    assert!(app.store.is_empty());
    assert_eq!(app.external.calls(), 0);
}

#[tokio::test]
async fn test_currency_and_amount_are_normalized() {
    let app = test_app(Duration::from_secs(30));
    let body = json!({
        "transaction_id": "txn_normalize",
        "source_account": "acc_user_001",
        "destination_account": "acc_merchant_001",
        "amount": "100.50",
        "currency": "usd"
    });

    let (status, _) = post_webhook(&app.router, body.to_string()).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (_, record) = get(&app.router, "/v1/transactions/txn_normalize").await;
    assert_eq!(record["currency"], "USD");
    assert_eq!(record["amount"], "100.5");
}

#[tokio::test]
async fn test_unknown_transaction_returns_404() {
    let app = test_app(Duration::ZERO);

    let (status, body) = get(&app.router, "/v1/transactions/nonexistent").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);
    assert_eq!(body["error"], "Not found: Transaction nonexistent not found");
}

#[tokio::test]
async fn test_health_and_readiness() {
    let app = test_app(Duration::ZERO);

    let (status, health) = get(&app.router, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "HEALTHY");
    assert!(health["current_time"].as_str().unwrap().ends_with('Z'));

    let (status, ready) = get(&app.router, "/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ready["store"], "connected");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = test_app(Duration::ZERO);

    let (status, doc) = get(&app.router, "/api-docs/openapi.json").await;

    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/v1/webhooks/transactions"].is_object());
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let app = test_app(Duration::ZERO);

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert!(response.headers().contains_key("x-request-id"));
}
