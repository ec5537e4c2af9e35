//! Route handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use uuid::Uuid;

use crate::api::auth::ApiKeyLayer;
use crate::api::schemas::{
    BalanceResponse, CancelResponse, GenerationListResponse, GenerationResponse,
    GenerationStatusResponse, ListQuery, OwnerQuery, PaymentWebhook,
};
use crate::error::Result;
use crate::models::{BalanceOperation, ModelConfig, NewGeneration};
use crate::AppState;

/// Build the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let api_keys = state.settings.server.api_keys.clone();
    let artifacts_root =
        std::path::PathBuf::from(&state.settings.storage.base_path).join("generations");
    Router::new()
        .route("/health", get(health))
        .route("/v1/generations", post(create_generation).get(list_generations))
        .route("/v1/generations/:id", get(get_generation))
        .route("/v1/generations/:id/status", get(get_generation_status))
        .route("/v1/generations/:id/cancel", post(cancel_generation))
        .route("/v1/models", get(list_models))
        .route("/v1/users/:user_id/balance", get(get_balance))
        .route("/v1/payments/webhook", post(payment_webhook))
        .nest_service("/files", ServeDir::new(artifacts_root))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(ApiKeyLayer::new(api_keys))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn create_generation(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NewGeneration>,
) -> Result<(StatusCode, Json<GenerationResponse>)> {
    let generation = state.generations.create_generation(request).await?;
    Ok((StatusCode::CREATED, Json(generation.into())))
}

async fn get_generation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(owner): Query<OwnerQuery>,
) -> Result<Json<GenerationResponse>> {
    let generation = state.generations.get_generation(id, owner.user_id).await?;
    Ok(Json(generation.into()))
}

async fn get_generation_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(owner): Query<OwnerQuery>,
) -> Result<Json<GenerationStatusResponse>> {
    let generation = state.generations.get_generation(id, owner.user_id).await?;
    Ok(Json(generation.into()))
}

async fn list_generations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<GenerationListResponse>> {
    let items = state
        .generations
        .list_generations(query.user_id, query.offset, query.limit, query.media_type)
        .await?;
    Ok(Json(GenerationListResponse {
        items: items.into_iter().map(Into::into).collect(),
    }))
}

async fn cancel_generation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(owner): Query<OwnerQuery>,
) -> Result<Json<CancelResponse>> {
    let cancelled = state
        .generations
        .cancel_generation(id, owner.user_id)
        .await?;
    Ok(Json(CancelResponse { cancelled }))
}

async fn list_models(State(state): State<Arc<AppState>>) -> Result<Json<Vec<ModelConfig>>> {
    let models = state.store.list_models(true).await?;
    Ok(Json(models))
}

async fn get_balance(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<BalanceResponse>> {
    let balance = state.ledger.balance(user_id).await?;
    Ok(Json(BalanceResponse { user_id, balance }))
}

/// Payment gateway callback: settles a purchase by crediting tokens through
/// the same ledger operation every other credit uses
async fn payment_webhook(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PaymentWebhook>,
) -> Result<Json<BalanceResponse>> {
    let balance = state
        .ledger
        .credit(
            payload.user_id,
            payload.tokens,
            BalanceOperation::Deposit,
            format!("Deposit via payment {}", payload.payment_id),
            Some(payload.payment_id),
        )
        .await?;
    Ok(Json(BalanceResponse {
        user_id: payload.user_id,
        balance,
    }))
}
