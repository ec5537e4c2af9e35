//! End-to-end generation lifecycle tests against the in-process service

use std::sync::Arc;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mediagen_orchestrator::{
    error::AppError,
    models::{BalanceOperation, GenerationStatus},
    notify::GenerationEvent,
    provider::TaskState,
    storage::Store,
};

use crate::common::{
    deposit, harness, image_model, motion_model, request, Poll, ScriptedProvider,
};

const USER: i64 = 42;

/// Serve one artifact and return its URL
async fn artifact_server() -> (MockServer, String) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/results/out.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png-bytes".to_vec()))
        .mount(&server)
        .await;
    let url = format!("{}/results/out.png", server.uri());
    (server, url)
}

#[tokio::test]
async fn successful_generation_stores_artifact_and_keeps_the_charge() {
    let (_server, artifact_url) = artifact_server().await;

    let provider = Arc::new(ScriptedProvider::succeeding_after(2, &artifact_url));
    let h = harness(provider, vec![image_model("pix", 15)], 10).await;
    deposit(&h.ledger, USER, 100).await;

    let generation = h
        .service
        .create_generation(request(USER, "pix"))
        .await
        .unwrap();
    assert_eq!(generation.status, GenerationStatus::Pending);
    assert_eq!(generation.tokens_spent, 15);

    assert!(h.supervisor.wait(generation.id).await);

    let stored = h.store.generation(generation.id).await.unwrap().unwrap();
    assert_eq!(stored.status, GenerationStatus::Success);
    assert_eq!(stored.provider_task_id.as_deref(), Some("task-1"));
    assert_eq!(stored.result_url.as_deref(), Some(artifact_url.as_str()));
    let file_path = stored.result_file_path.unwrap();
    assert_eq!(
        tokio::fs::read(&file_path).await.unwrap(),
        b"png-bytes".to_vec()
    );

    // Exactly one gallery item, pointing at the stored file
    let item = h.store.gallery_item_for(generation.id).await.unwrap().unwrap();
    assert_eq!(item.user_id, USER);
    assert_eq!(item.file_path, file_path);
    assert_eq!(item.file_type, "image");

    // The charge stands: no refund entry in the audit trail
    assert_eq!(h.ledger.balance(USER).await.unwrap(), 85);
    let history = h.store.balance_history(USER).await.unwrap();
    assert!(!history
        .iter()
        .any(|e| e.operation == BalanceOperation::Refund));

    let events = h.notifier.events();
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        (u, GenerationEvent::Completed { generation_id, .. })
            if *u == USER && *generation_id == generation.id
    ));
}

#[tokio::test]
async fn insufficient_balance_rejects_before_any_record_exists() {
    let provider = Arc::new(ScriptedProvider::never_resolving());
    let h = harness(provider, vec![image_model("pix", 15)], 3).await;
    deposit(&h.ledger, USER, 10).await;

    let err = h
        .service
        .create_generation(request(USER, "pix"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::InsufficientBalance {
            required: 15,
            available: 10
        }
    ));

    assert_eq!(h.ledger.balance(USER).await.unwrap(), 10);
    assert!(h
        .service
        .list_generations(USER, 0, 10, None)
        .await
        .unwrap()
        .is_empty());
    // Only the deposit is in the audit trail
    assert_eq!(h.store.balance_history(USER).await.unwrap().len(), 1);
}

#[tokio::test]
async fn capability_validation_happens_before_the_reservation() {
    let provider = Arc::new(ScriptedProvider::never_resolving());
    let h = harness(provider, vec![motion_model("motion", 2)], 3).await;
    deposit(&h.ledger, USER, 100).await;

    // Motion transfer needs both a source image and a driving video
    let mut req = request(USER, "motion");
    req.image_url = Some("https://cdn.example/source.png".to_string());
    req.duration = Some(5);

    let err = h.service.create_generation(req).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    assert_eq!(h.ledger.balance(USER).await.unwrap(), 100);
    assert_eq!(h.store.balance_history(USER).await.unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_model_is_not_found() {
    let provider = Arc::new(ScriptedProvider::never_resolving());
    let h = harness(provider, vec![image_model("pix", 15)], 3).await;
    deposit(&h.ledger, USER, 100).await;

    let err = h
        .service
        .create_generation(request(USER, "does-not-exist"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound("Model", _)));
    assert_eq!(h.ledger.balance(USER).await.unwrap(), 100);
}

#[tokio::test]
async fn model_bound_to_unregistered_provider_never_touches_the_ledger() {
    let provider = Arc::new(ScriptedProvider::never_resolving());
    let mut model = image_model("orphan", 15);
    model.provider = "not-registered".to_string();
    let h = harness(provider, vec![model], 3).await;
    deposit(&h.ledger, USER, 100).await;

    let err = h
        .service
        .create_generation(request(USER, "orphan"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ProviderNotFound(key) if key == "not-registered"));

    assert_eq!(h.ledger.balance(USER).await.unwrap(), 100);
    assert_eq!(h.store.balance_history(USER).await.unwrap().len(), 1);
}

#[tokio::test]
async fn dispatch_failure_fails_the_generation_and_refunds() {
    let provider = Arc::new(ScriptedProvider::failing_create());
    let h = harness(provider, vec![image_model("pix", 15)], 3).await;
    deposit(&h.ledger, USER, 100).await;

    let generation = h
        .service
        .create_generation(request(USER, "pix"))
        .await
        .unwrap();
    assert!(h.supervisor.wait(generation.id).await);

    let stored = h.store.generation(generation.id).await.unwrap().unwrap();
    assert_eq!(stored.status, GenerationStatus::Failed);
    // The provider-side task never existed
    assert!(stored.provider_task_id.is_none());
    assert!(stored
        .error_message
        .as_deref()
        .unwrap()
        .starts_with("Provider dispatch failed"));

    assert_eq!(h.ledger.balance(USER).await.unwrap(), 100);

    let events = h.notifier.events();
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        (_, GenerationEvent::Failed { tokens_refunded: 15, .. })
    ));
}

#[tokio::test]
async fn provider_reported_failure_refunds_exactly_once() {
    let provider = Arc::new(ScriptedProvider::failing_with("content policy violation"));
    let h = harness(provider, vec![image_model("pix", 15)], 5).await;
    deposit(&h.ledger, USER, 100).await;

    let generation = h
        .service
        .create_generation(request(USER, "pix"))
        .await
        .unwrap();
    assert!(h.supervisor.wait(generation.id).await);

    let stored = h.store.generation(generation.id).await.unwrap().unwrap();
    assert_eq!(stored.status, GenerationStatus::Failed);
    assert_eq!(
        stored.error_message.as_deref(),
        Some("content policy violation")
    );

    assert_eq!(h.ledger.balance(USER).await.unwrap(), 100);
    let refunds: Vec<_> = h
        .store
        .balance_history(USER)
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.operation == BalanceOperation::Refund)
        .collect();
    assert_eq!(refunds.len(), 1);
    assert_eq!(refunds[0].amount, 15);
    assert_eq!(
        refunds[0].reference_id.as_deref(),
        Some(generation.id.to_string().as_str())
    );

    // No gallery item for a failed generation
    assert!(h
        .store
        .gallery_item_for(generation.id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn exhausted_attempt_budget_times_out_and_refunds() {
    let provider = Arc::new(ScriptedProvider::never_resolving());
    let h = harness(provider, vec![image_model("pix", 15)], 3).await;
    deposit(&h.ledger, USER, 100).await;

    let generation = h
        .service
        .create_generation(request(USER, "pix"))
        .await
        .unwrap();
    assert!(h.supervisor.wait(generation.id).await);

    let stored = h.store.generation(generation.id).await.unwrap().unwrap();
    assert_eq!(stored.status, GenerationStatus::Failed);
    assert_eq!(
        stored.error_message.as_deref(),
        Some("Timed out waiting for the provider")
    );
    assert_eq!(h.ledger.balance(USER).await.unwrap(), 100);
}

#[tokio::test]
async fn success_without_a_result_url_is_a_failure() {
    let provider = Arc::new(ScriptedProvider::with_polls(vec![Poll::State(
        TaskState::Succeeded { result_url: None },
    )]));
    let h = harness(provider, vec![image_model("pix", 15)], 5).await;
    deposit(&h.ledger, USER, 100).await;

    let generation = h
        .service
        .create_generation(request(USER, "pix"))
        .await
        .unwrap();
    assert!(h.supervisor.wait(generation.id).await);

    let stored = h.store.generation(generation.id).await.unwrap().unwrap();
    assert_eq!(stored.status, GenerationStatus::Failed);
    assert_eq!(
        stored.error_message.as_deref(),
        Some("Provider reported success without a result")
    );
    assert_eq!(h.ledger.balance(USER).await.unwrap(), 100);
}

#[tokio::test]
async fn failed_artifact_download_refunds() {
    // Provider claims success but the result URL serves a 404
    let server = MockServer::start().await;
    let missing = format!("{}/results/gone.png", server.uri());

    let provider = Arc::new(ScriptedProvider::succeeding_after(0, &missing));
    let h = harness(provider, vec![image_model("pix", 15)], 5).await;
    deposit(&h.ledger, USER, 100).await;

    let generation = h
        .service
        .create_generation(request(USER, "pix"))
        .await
        .unwrap();
    assert!(h.supervisor.wait(generation.id).await);

    let stored = h.store.generation(generation.id).await.unwrap().unwrap();
    assert_eq!(stored.status, GenerationStatus::Failed);
    assert!(stored
        .error_message
        .as_deref()
        .unwrap()
        .starts_with("Result download failed"));
    assert_eq!(h.ledger.balance(USER).await.unwrap(), 100);
    assert!(h
        .store
        .gallery_item_for(generation.id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn transient_poll_errors_do_not_end_the_generation() {
    let (_server, artifact_url) = artifact_server().await;

    let provider = Arc::new(ScriptedProvider::with_polls(vec![
        Poll::TransientError,
        Poll::TransientError,
        Poll::State(TaskState::Succeeded {
            result_url: Some(artifact_url.clone()),
        }),
    ]));
    let h = harness(provider, vec![image_model("pix", 15)], 10).await;
    deposit(&h.ledger, USER, 100).await;

    let generation = h
        .service
        .create_generation(request(USER, "pix"))
        .await
        .unwrap();
    assert!(h.supervisor.wait(generation.id).await);

    let stored = h.store.generation(generation.id).await.unwrap().unwrap();
    assert_eq!(stored.status, GenerationStatus::Success);
    assert_eq!(h.ledger.balance(USER).await.unwrap(), 85);
}

#[tokio::test]
async fn duration_priced_video_charges_per_second() {
    let (_server, artifact_url) = artifact_server().await;

    let provider = Arc::new(ScriptedProvider::succeeding_after(0, &artifact_url));
    let mut model = motion_model("clip", 4);
    model.requires_image = false;
    model.requires_video = false;
    model.durations = vec![5, 10];
    let h = harness(provider, vec![model], 10).await;
    deposit(&h.ledger, USER, 100).await;

    let mut req = request(USER, "clip");
    req.duration = Some(10);

    let generation = h.service.create_generation(req).await.unwrap();
    assert_eq!(generation.tokens_spent, 40);
    assert!(h.supervisor.wait(generation.id).await);

    assert_eq!(h.ledger.balance(USER).await.unwrap(), 60);
}

#[tokio::test]
async fn ownership_is_enforced_on_reads() {
    let provider = Arc::new(ScriptedProvider::never_resolving());
    let h = harness(provider, vec![image_model("pix", 15)], 3).await;
    deposit(&h.ledger, USER, 100).await;

    let generation = h
        .service
        .create_generation(request(USER, "pix"))
        .await
        .unwrap();

    let err = h
        .service
        .get_generation(generation.id, USER + 1)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound("Generation", _)));

    assert!(h.service.get_generation(generation.id, USER).await.is_ok());
    assert!(h.supervisor.wait(generation.id).await);
}

#[tokio::test]
async fn cancel_reports_false_before_dispatch_and_for_unsupported_providers() {
    let provider = Arc::new(ScriptedProvider::never_resolving());
    let h = harness(provider, vec![image_model("pix", 15)], 3).await;
    deposit(&h.ledger, USER, 100).await;

    let generation = h
        .service
        .create_generation(request(USER, "pix"))
        .await
        .unwrap();

    // Regardless of dispatch timing, this provider cannot abort remotely
    let cancelled = h
        .service
        .cancel_generation(generation.id, USER)
        .await
        .unwrap();
    assert!(!cancelled);

    // The poll loop still runs to its natural resolution
    assert!(h.supervisor.wait(generation.id).await);
    let stored = h.store.generation(generation.id).await.unwrap().unwrap();
    assert!(stored.status.is_terminal());
}
