//! API integration tests
//!
//! Run against a live server (`cargo run`) with: cargo test -- --ignored

use chrono::{Duration, Utc};
use librent_server::models::ActorClaims;
use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

fn jwt_secret() -> String {
    std::env::var("JWT_SECRET").unwrap_or_else(|_| "change-this-secret-in-production".to_string())
}

/// Mint a bearer token the way the external identity provider would
fn token_for(user_id: i32, staff: bool) -> String {
    let now = Utc::now().timestamp();
    let claims = ActorClaims {
        sub: format!("user-{}", user_id),
        user_id,
        staff,
        exp: now + 3600,
        iat: now,
    };
    claims
        .create_token(&jwt_secret())
        .expect("Failed to mint token")
}

fn fresh_user_id() -> i32 {
    (Utc::now().timestamp_millis() % i32::MAX as i64) as i32
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_unauthorized_access() {
    let client = Client::new();

    let response = client
        .get(format!("{}/borrowings", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_create_and_delete_book() {
    let client = Client::new();
    let token = token_for(fresh_user_id(), true);

    // Create book
    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "title": "Integration Test Book",
            "author": "Test Author",
            "cover": "HARD",
            "inventory": 3,
            "daily_fee": "1.50"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse response");
    let book_id = body["id"].as_i64().expect("No book ID");
    assert_eq!(body["inventory"], 3);

    // Delete book
    let response = client
        .delete(format!("{}/books/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 204);
}

#[tokio::test]
#[ignore]
async fn test_non_staff_cannot_create_book() {
    let client = Client::new();
    let token = token_for(fresh_user_id(), false);

    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "title": "Forbidden Book",
            "author": "Test Author",
            "cover": "SOFT",
            "inventory": 1,
            "daily_fee": "2.00"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore]
async fn test_create_book_rejects_empty_title() {
    let client = Client::new();
    let token = token_for(fresh_user_id(), true);

    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "title": "   ",
            "author": "Test Author",
            "cover": "HARD",
            "inventory": 1,
            "daily_fee": "1.00"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
#[ignore]
async fn test_list_books() {
    let client = Client::new();
    let token = token_for(fresh_user_id(), false);

    let response = client
        .get(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body.is_array());
}

#[tokio::test]
#[ignore]
async fn test_borrowing_rejects_past_return_date() {
    let client = Client::new();
    let staff_token = token_for(fresh_user_id(), true);
    let user_token = token_for(fresh_user_id(), false);

    // A book to (fail to) borrow
    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", staff_token))
        .json(&json!({
            "title": "Past Date Book",
            "author": "Test Author",
            "cover": "SOFT",
            "inventory": 2,
            "daily_fee": "1.00"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    let book_id = body["id"].as_i64().expect("No book ID");

    let yesterday = (Utc::now().date_naive() - Duration::days(1)).to_string();
    let response = client
        .post(format!("{}/borrowings", BASE_URL))
        .header("Authorization", format!("Bearer {}", user_token))
        .json(&json!({
            "book_id": book_id,
            "expected_return_date": yesterday
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "validation_error");

    // Nothing was created, so the book deletes cleanly
    let response = client
        .delete(format!("{}/books/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", staff_token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 204);
}

#[tokio::test]
#[ignore]
async fn test_get_missing_borrowing_not_found() {
    let client = Client::new();
    let token = token_for(fresh_user_id(), true);

    let response = client
        .get(format!("{}/borrowings/999999999", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore]
async fn test_webhook_rejects_missing_signature() {
    let client = Client::new();

    let response = client
        .post(format!("{}/webhooks/stripe", BASE_URL))
        .body(r#"{"type":"checkout.session.completed"}"#)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_webhook_rejects_bad_signature() {
    let client = Client::new();

    let response = client
        .post(format!("{}/webhooks/stripe", BASE_URL))
        .header("Stripe-Signature", "t=1700000000,v1=deadbeef")
        .body(r#"{"type":"checkout.session.completed","data":{"object":{"id":"cs_x"}}}"#)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_payment_success_unknown_session() {
    let client = Client::new();

    let response = client
        .get(format!(
            "{}/payments/stripe/success?session_id=cs_test_does_not_exist",
            BASE_URL
        ))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore]
async fn test_cancel_unknown_session() {
    let client = Client::new();

    let response = client
        .post(format!("{}/payments/cancel", BASE_URL))
        .json(&json!({ "session_id": "cs_test_does_not_exist" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 404);
}
