//! Common traits and types for generation providers

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// Normalized request handed to a provider adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRequest {
    /// Provider-specific model identifier
    pub model: String,

    pub prompt: Option<String>,

    /// Reference image location(s), e.g. for image-to-video or editing
    #[serde(default)]
    pub image_urls: Vec<String>,

    /// Reference video location(s), e.g. for motion transfer
    #[serde(default)]
    pub video_urls: Vec<String>,

    pub aspect_ratio: String,

    /// Requested clip length in seconds, video models only
    pub duration: Option<u32>,

    /// Output container the caller expects ("png", "mp4", ...)
    pub output_format: String,

    /// Free-form model-specific parameters forwarded verbatim
    #[serde(default)]
    pub extra_params: Map<String, Value>,
}

/// Handle to a task accepted by a provider
#[derive(Debug, Clone)]
pub struct TaskHandle {
    pub id: String,
}

/// Canonical task outcome every adapter translates its provider's status
/// vocabulary into
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Processing,
    /// The provider reports completion. A missing result location is for
    /// the orchestrator to resolve, not the adapter.
    Succeeded { result_url: Option<String> },
    Failed { error: String },
}

/// Trait implemented once per integrated external generation service
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Registry key models bind to
    fn name(&self) -> &str;

    /// Submit a generation task. A failure here is terminal for the
    /// generation; the orchestrator does not retry creates.
    async fn create_task(&self, request: &TaskRequest) -> Result<TaskHandle>;

    /// Poll a task. Status values outside the adapter's known mapping must
    /// come back as [`TaskState::Processing`], never success or failure.
    async fn task_status(&self, task_id: &str) -> Result<TaskState>;

    /// Best-effort cancellation. Adapters that cannot abort remote work
    /// return false rather than claim success.
    async fn cancel_task(&self, task_id: &str) -> bool;
}
