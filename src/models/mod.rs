//! Domain types shared across the orchestration service

pub mod catalog;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Map;
use uuid::Uuid;

/// Kind of media a model produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
    Faceswap,
}

impl MediaType {
    /// Output container the provider is asked for
    pub fn output_format(&self) -> &'static str {
        match self {
            MediaType::Image => "png",
            MediaType::Video | MediaType::Faceswap => "mp4",
        }
    }

    /// File type recorded on gallery items
    pub fn file_type(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video | MediaType::Faceswap => "video",
        }
    }
}

/// Lifecycle status of a generation task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Pending,
    Processing,
    Success,
    Failed,
}

impl GenerationStatus {
    /// Terminal statuses are never mutated again
    pub fn is_terminal(&self) -> bool {
        matches!(self, GenerationStatus::Success | GenerationStatus::Failed)
    }
}

/// Kind of balance mutation recorded in the ledger audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceOperation {
    Deposit,
    Generation,
    Referral,
    Welcome,
    Admin,
    Refund,
}

/// One generation request's lifecycle record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Generation {
    pub id: Uuid,
    pub user_id: i64,
    pub media_type: MediaType,
    pub model_code: String,

    // Input
    pub prompt: Option<String>,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub aspect_ratio: String,
    pub duration: Option<u32>,
    #[serde(default)]
    pub extra_params: Map<String, serde_json::Value>,

    // Output
    pub provider_task_id: Option<String>,
    pub result_url: Option<String>,
    pub result_file_path: Option<String>,

    // Economics
    pub tokens_spent: i64,

    pub status: GenerationStatus,
    pub error_message: Option<String>,

    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Generation {
    /// Build a fresh pending record for an accepted request
    pub fn new(request: &NewGeneration, model: &ModelConfig, tokens_spent: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: request.user_id,
            media_type: model.media_type,
            model_code: model.code.clone(),
            prompt: request.prompt.clone(),
            image_url: request.image_url.clone(),
            video_url: request.video_url.clone(),
            aspect_ratio: request.aspect_ratio.clone(),
            duration: request.duration,
            extra_params: request.extra_params.clone(),
            provider_task_id: None,
            result_url: None,
            result_file_path: None,
            tokens_spent,
            status: GenerationStatus::Pending,
            error_message: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

/// Incoming request to start a generation
#[derive(Debug, Clone, Deserialize)]
pub struct NewGeneration {
    pub user_id: i64,
    pub model_code: String,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub extra_params: Map<String, serde_json::Value>,
}

fn default_aspect_ratio() -> String {
    "1:1".to_string()
}

/// Append-only ledger entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceEntry {
    pub user_id: i64,
    pub amount: i64,
    pub balance_after: i64,
    pub operation: BalanceOperation,
    pub description: String,
    pub reference_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Gallery record created for each successful generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryItem {
    pub id: Uuid,
    pub user_id: i64,
    pub generation_id: Uuid,
    pub file_path: String,
    pub file_type: String,
    pub created_at: DateTime<Utc>,
}

impl GalleryItem {
    pub fn for_generation(generation: &Generation, file_path: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: generation.user_id,
            generation_id: generation.id,
            file_path,
            file_type: generation.media_type.file_type().to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Pricing and capability configuration for one AI model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub enabled: bool,

    /// Provider registry key this model is bound to
    pub provider: String,
    /// Model identifier understood by that provider
    pub provider_model: String,

    pub media_type: MediaType,

    /// Fixed price when no per-second pricing applies
    pub price_tokens: i64,
    /// Per-second price for duration-priced video models
    #[serde(default)]
    pub price_per_second: Option<i64>,

    // Capability flags
    #[serde(default)]
    pub requires_image: bool,
    #[serde(default)]
    pub requires_video: bool,
    #[serde(default)]
    pub aspect_ratios: Vec<String>,
    #[serde(default)]
    pub durations: Vec<u32>,

    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub icon: Option<String>,
}
