mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use crate::common::setup_test_db;

async fn build_test_router() -> Router {
    let db = setup_test_db().await.expect("Failed to connect to test DB");

    Router::new()
        .route(
            "/api/investment-ticket",
            post(agod_minter_backend::handlers::ticket::create_ticket),
        )
        .route(
            "/api/investment-ticket/{tx_hash}",
            get(agod_minter_backend::handlers::ticket::get_ticket),
        )
        .with_state(db)
}

/// Unique 32-byte hash per test run so tests do not collide in a shared DB
fn unique_hash() -> String {
    format!(
        "0x{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    )
}

fn ticket_body(tx_hash: &str) -> Value {
    json!({
        "investmentAmountFiat": "1500.00",
        "investmentAmountCrypto": "0.035000000000000000",
        "investmentInfo": "Investment pool deposit",
        "transactionHash": tx_hash,
        "walletAddress": "0x1111111111111111111111111111111111111111"
    })
}

async fn post_ticket(app: &Router, body: &Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/investment-ticket")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn test_create_ticket_returns_created_record() {
    let app = build_test_router().await;
    let tx_hash = unique_hash();

    let (status, body) = post_ticket(&app, &ticket_body(&tx_hash)).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["transactionHash"].as_str().unwrap(), tx_hash);
    assert!(
        !body["transactionId"].as_str().unwrap().is_empty(),
        "Should return a server-generated transaction id"
    );
    assert_eq!(
        body["walletAddress"].as_str().unwrap(),
        "0x1111111111111111111111111111111111111111"
    );
}

#[tokio::test]
async fn test_duplicate_hash_is_a_conflict_not_a_second_record() {
    let app = build_test_router().await;
    let tx_hash = unique_hash();

    let (first_status, first_body) = post_ticket(&app, &ticket_body(&tx_hash)).await;
    assert_eq!(first_status, StatusCode::CREATED);

    let (second_status, second_body) = post_ticket(&app, &ticket_body(&tx_hash)).await;
    assert_eq!(second_status, StatusCode::CONFLICT);
    assert_eq!(second_body["code"].as_str().unwrap(), "ALREADY_RECORDED");

    // The surviving record is still the first one
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/investment-ticket/{}", tx_hash))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let fetched: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(
        fetched["transactionId"].as_str().unwrap(),
        first_body["transactionId"].as_str().unwrap()
    );
}

#[tokio::test]
async fn test_missing_field_is_rejected() {
    let app = build_test_router().await;

    let mut body = ticket_body(&unique_hash());
    body.as_object_mut().unwrap().remove("walletAddress");

    let (status, json) = post_ticket(&app, &body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"].as_str().unwrap(), "MISSING_FIELDS");
}

#[tokio::test]
async fn test_zero_amount_is_rejected() {
    let app = build_test_router().await;

    let mut body = ticket_body(&unique_hash());
    body["investmentAmountFiat"] = json!("0");

    let (status, _) = post_ticket(&app, &body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_unknown_hash_is_not_found() {
    let app = build_test_router().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/investment-ticket/{}", unique_hash()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
