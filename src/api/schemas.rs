//! Request and response bodies for the HTTP surface

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Generation, GenerationStatus, MediaType};

/// Full generation view returned on create and fetch
#[derive(Debug, Serialize)]
pub struct GenerationResponse {
    pub id: Uuid,
    pub media_type: MediaType,
    pub model_code: String,
    pub status: GenerationStatus,
    pub prompt: Option<String>,
    pub tokens_spent: i64,
    pub result_url: Option<String>,
    pub result_file_path: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<Generation> for GenerationResponse {
    fn from(g: Generation) -> Self {
        Self {
            id: g.id,
            media_type: g.media_type,
            model_code: g.model_code,
            status: g.status,
            prompt: g.prompt,
            tokens_spent: g.tokens_spent,
            result_url: g.result_url,
            result_file_path: g.result_file_path,
            error_message: g.error_message,
            created_at: g.created_at,
            completed_at: g.completed_at,
        }
    }
}

/// Slim view for client-side polling
#[derive(Debug, Serialize)]
pub struct GenerationStatusResponse {
    pub id: Uuid,
    pub status: GenerationStatus,
    pub result_url: Option<String>,
    pub result_file_path: Option<String>,
    pub error_message: Option<String>,
}

impl From<Generation> for GenerationStatusResponse {
    fn from(g: Generation) -> Self {
        Self {
            id: g.id,
            status: g.status,
            result_url: g.result_url,
            result_file_path: g.result_file_path,
            error_message: g.error_message,
        }
    }
}

/// Owner scope for single-generation reads; authentication itself lives in
/// the transport layer outside this crate
#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    pub user_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub user_id: i64,
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub media_type: Option<MediaType>,
}

fn default_limit() -> usize {
    50
}

#[derive(Debug, Serialize)]
pub struct GenerationListResponse {
    pub items: Vec<GenerationResponse>,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub user_id: i64,
    pub balance: i64,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}

/// Payload delivered by the payment gateway once a purchase settles
#[derive(Debug, Deserialize)]
pub struct PaymentWebhook {
    pub user_id: i64,
    pub tokens: i64,
    pub payment_id: String,
}
