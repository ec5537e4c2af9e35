//! HTTP surface tests driven through the router with `oneshot`

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header::AUTHORIZATION, header::CONTENT_TYPE, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use mediagen_orchestrator::{
    api::routes::create_router,
    config::Settings,
    storage::Store,
    AppState,
};

use crate::common::{deposit, harness, image_model, Harness, ScriptedProvider};

const API_KEY: &str = "secret-key";

async fn app_with_keys(h: &Harness, api_keys: Vec<String>) -> Router {
    let mut settings = Settings::default();
    settings.server.api_keys = api_keys;

    let store: Arc<dyn Store> = h.store.clone();
    create_router(Arc::new(AppState {
        settings,
        store,
        ledger: h.ledger.clone(),
        generations: h.service.clone(),
    }))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_is_open_but_the_api_needs_a_key() {
    let provider = Arc::new(ScriptedProvider::never_resolving());
    let h = harness(provider, vec![image_model("pix", 15)], 3).await;
    let app = app_with_keys(&h, vec![API_KEY.to_string()]).await;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/v1/models")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["type"], "authentication_error");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/models")
                .header(AUTHORIZATION, format!("Bearer {}", API_KEY))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn create_then_poll_a_generation_over_http() {
    let provider = Arc::new(ScriptedProvider::failing_with("no capacity"));
    let h = harness(provider, vec![image_model("pix", 15)], 5).await;
    deposit(&h.ledger, 7, 100).await;
    let app = app_with_keys(&h, Vec::new()).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/generations")
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({
                        "user_id": 7,
                        "model_code": "pix",
                        "prompt": "a lighthouse"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["status"], "pending");
    assert_eq!(created["tokens_spent"], 15);
    let id = created["id"].as_str().unwrap().to_string();

    assert!(h.supervisor.wait(id.parse().unwrap()).await);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/v1/generations/{}/status?user_id=7", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let status = body_json(response).await;
    assert_eq!(status["status"], "failed");
    assert_eq!(status["error_message"], "no capacity");
}

#[tokio::test]
async fn shortfall_maps_to_payment_required() {
    let provider = Arc::new(ScriptedProvider::never_resolving());
    let h = harness(provider, vec![image_model("pix", 15)], 3).await;
    deposit(&h.ledger, 7, 10).await;
    let app = app_with_keys(&h, Vec::new()).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/generations")
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "user_id": 7, "model_code": "pix", "prompt": "x" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "insufficient_balance");
}

#[tokio::test]
async fn payment_webhook_credits_the_balance() {
    let provider = Arc::new(ScriptedProvider::never_resolving());
    let h = harness(provider, vec![image_model("pix", 15)], 3).await;
    let app = app_with_keys(&h, Vec::new()).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/payments/webhook")
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "user_id": 9, "tokens": 250, "payment_id": "pay_123" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["balance"], 250);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/users/9/balance")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["balance"], 250);
}
