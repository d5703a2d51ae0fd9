//! End-to-end flows through the router with an in-memory database and the
//! fake billing provider.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;

use fit_coach_api::{create_app, AppState};
use fit_coach_data::database::create_in_memory_pool;
use fit_coach_domain::auth::token::{TokenConfig, TokenService};
use fit_coach_domain::testing::FakeBillingGateway;

fn test_app() -> Router {
    let pool = create_in_memory_pool().unwrap();
    let tokens = Arc::new(TokenService::new(TokenConfig::new("integration-secret", "fit-coach-test")));
    let gateway = Arc::new(FakeBillingGateway::new());
    create_app(AppState::new(&pool, tokens, gateway, Some("price_basic".to_string()), "development"))
}

async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

/// Register a coach, add one client and sign the client in
async fn coach_and_client(app: &Router) -> (String, String, String) {
    let (status, session) = send(
        app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "name": "Coach", "email": "coach@example.com", "password": "coach-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let coach_token = session["tokens"]["access_token"].as_str().unwrap().to_string();

    let (status, client) = send(
        app,
        Method::POST,
        "/api/v1/clients",
        Some(&coach_token),
        Some(json!({ "name": "Client", "email": "client@example.com", "password": "client-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let client_id = client["id"].as_str().unwrap().to_string();

    let (status, session) = send(
        app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": "client@example.com", "password": "client-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let client_token = session["tokens"]["access_token"].as_str().unwrap().to_string();

    (coach_token, client_token, client_id)
}

#[tokio::test]
async fn test_register_and_me() {
    let app = test_app();
    let (coach_token, client_token, client_id) = coach_and_client(&app).await;

    let (status, me) = send(&app, Method::GET, "/auth/me", Some(&coach_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["role"], "coach");

    let (status, me) = send(&app, Method::GET, "/auth/me", Some(&client_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], client_id.as_str());
}

#[tokio::test]
async fn test_client_completes_assigned_habit() {
    let app = test_app();
    let (coach_token, client_token, client_id) = coach_and_client(&app).await;

    let (status, habit) = send(
        &app,
        Method::POST,
        &format!("/api/v1/clients/{}/habits", client_id),
        Some(&coach_token),
        Some(json!({ "name": "Walk 8k steps", "cadence": { "frequency": "daily" } })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let habit_id = habit["id"].as_str().unwrap().to_string();

    let today = Utc::now().date_naive();
    let completion = format!("/api/v1/habits/{}/completions/{}", habit_id, today);
    let (status, _) = send(&app, Method::POST, &completion, Some(&client_token), None).await;
    assert_eq!(status, StatusCode::OK);

    // Completing twice is harmless
    let (status, _) = send(&app, Method::POST, &completion, Some(&client_token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, progress) = send(
        &app,
        Method::GET,
        &format!("/api/v1/habits/{}/progress?date={}", habit_id, today),
        Some(&coach_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(progress["completed"], 1);
    assert_eq!(progress["target"], 7);
}

#[tokio::test]
async fn test_subscription_follows_webhook_events() {
    let app = test_app();
    let (coach_token, client_token, client_id) = coach_and_client(&app).await;
    let subscription_path = format!("/api/v1/clients/{}/subscription", client_id);

    let (status, overview) = send(
        &app,
        Method::POST,
        &subscription_path,
        Some(&coach_token),
        Some(json!({ "price_id": "price_basic" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(overview["subscription"]["status"], "active");
    let subscription_id = overview["subscription"]["subscription_id"].as_str().unwrap().to_string();
    let customer_id = overview["subscription"]["customer_id"].as_str().unwrap().to_string();

    let (status, _) = send(&app, Method::POST, &subscription_path, Some(&coach_token), Some(json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let payload = FakeBillingGateway::subscription_event(
        "customer.subscription.updated",
        &subscription_id,
        &customer_id,
        "past_due",
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri("/webhooks/stripe")
        .header("Stripe-Signature", FakeBillingGateway::sign(&payload))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let outcome: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(outcome["handled"], true);
    assert_eq!(outcome["event"], "customer.subscription.updated");

    let (status, overview) = send(&app, Method::GET, &subscription_path, Some(&client_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(overview["subscription"]["status"], "past_due");
}

#[tokio::test]
async fn test_saved_payment_method_is_listed() {
    let app = test_app();
    let (coach_token, client_token, client_id) = coach_and_client(&app).await;
    let subscription_path = format!("/api/v1/clients/{}/subscription", client_id);

    let (status, _) = send(&app, Method::POST, &subscription_path, Some(&coach_token), None).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, method) = send(
        &app,
        Method::PUT,
        &format!("{}/payment-method", subscription_path),
        Some(&client_token),
        Some(json!({ "payment_method_id": "pm_card_visa" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(method["id"], "pm_card_visa");

    let (status, methods) = send(
        &app,
        Method::GET,
        &format!("{}/payment-methods", subscription_path),
        Some(&coach_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(methods.as_array().map(Vec::len), Some(1));
    assert_eq!(methods[0]["id"], "pm_card_visa");
    assert_eq!(methods[0]["last4"], "4242");
}

#[tokio::test]
async fn test_webhook_without_signature_is_rejected() {
    let app = test_app();
    let (status, body) = send(&app, Method::POST, "/webhooks/stripe", None, Some(json!({ "type": "ping" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_chat_unread_counts() {
    let app = test_app();
    let (coach_token, client_token, client_id) = coach_and_client(&app).await;

    let (status, me) = send(&app, Method::GET, "/auth/me", Some(&coach_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let coach_id = me["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/v1/conversations/{}/messages", coach_id),
        Some(&client_token),
        Some(json!({ "body": "Can I swap Tuesday's session?" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, unread) = send(&app, Method::GET, "/api/v1/messages/unread", Some(&coach_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(unread["total"], 1);

    let (status, page) = send(
        &app,
        Method::GET,
        &format!("/api/v1/conversations/{}/messages?mark_read=true", client_id),
        Some(&coach_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);

    let (_, unread) = send(&app, Method::GET, "/api/v1/messages/unread", Some(&coach_token), None).await;
    assert_eq!(unread["total"], 0);
}

#[tokio::test]
async fn test_clients_cannot_use_coach_routes() {
    let app = test_app();
    let (_, client_token, _) = coach_and_client(&app).await;

    let (status, body) = send(&app, Method::GET, "/api/v1/clients", Some(&client_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, _) = send(&app, Method::GET, "/api/v1/habit-presets", Some(&client_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_missing_token_is_unauthorized_or_redirects() {
    let app = test_app();

    let (status, body) = send(&app, Method::GET, "/api/v1/clients", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let request = Request::builder()
        .uri("/api/v1/clients")
        .header(header::ACCEPT, "text/html,application/xhtml+xml")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/login");
}

#[tokio::test]
async fn test_logout_revokes_tokens() {
    let app = test_app();
    let (coach_token, _, _) = coach_and_client(&app).await;

    let (status, _) = send(&app, Method::POST, "/auth/logout", Some(&coach_token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::GET, "/auth/me", Some(&coach_token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
