//! kie.ai adapter
//!
//! Jobs API: `POST /jobs/createTask`, `GET /jobs/recordInfo?taskId=`, both
//! wrapped in a `{code, msg, data}` envelope where `code == 200` means
//! success regardless of the HTTP status line.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::config::ProviderSettings;
use crate::error::{AppError, Result};
use crate::provider::traits::{GenerationProvider, TaskHandle, TaskRequest, TaskState};

const PROVIDER_NAME: &str = "kie";

/// kie.ai API adapter
pub struct KieProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl KieProvider {
    /// Build the adapter with its own bounded request timeout, distinct
    /// from the orchestrator's poll budget.
    pub fn new(settings: &ProviderSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
        })
    }

    async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<Value>,
        query: Option<&[(&str, &str)]>,
    ) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);

        let mut builder = self
            .client
            .request(method, &url)
            .bearer_auth(&self.api_key);
        if let Some(body) = body {
            builder = builder.json(&body);
        }
        if let Some(query) = query {
            builder = builder.query(query);
        }

        let response = builder.send().await.map_err(|e| AppError::ExternalService {
            service: PROVIDER_NAME.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        let payload: Value = response.json().await.map_err(|e| AppError::ExternalService {
            service: PROVIDER_NAME.to_string(),
            message: format!("Malformed response: {}", e),
        })?;

        let code = payload.get("code").and_then(Value::as_i64);
        debug!(endpoint = %path, status = %status, code = ?code, "kie.ai response");

        if !status.is_success() || code != Some(200) {
            let message = payload
                .get("msg")
                .and_then(Value::as_str)
                .unwrap_or("Unknown error")
                .to_string();
            return Err(AppError::ExternalService {
                service: PROVIDER_NAME.to_string(),
                message,
            });
        }

        Ok(payload)
    }
}

/// Build the `input` object of a createTask payload
fn build_input(request: &TaskRequest) -> Value {
    let mut input = Map::new();
    input.insert(
        "prompt".to_string(),
        Value::String(request.prompt.clone().unwrap_or_default()),
    );

    // Motion-control models take their references under different keys and
    // ignore aspect ratio / duration.
    if request.model.contains("motion-control") {
        if !request.image_urls.is_empty() {
            input.insert("input_urls".to_string(), json!(request.image_urls));
        }
        if !request.video_urls.is_empty() {
            input.insert("video_urls".to_string(), json!(request.video_urls));
        }
        let mode = request
            .extra_params
            .get("mode")
            .and_then(Value::as_str)
            .unwrap_or("720p");
        input.insert("mode".to_string(), Value::String(mode.to_string()));
        let orientation = request
            .extra_params
            .get("character_orientation")
            .and_then(Value::as_str)
            .unwrap_or("image");
        input.insert(
            "character_orientation".to_string(),
            Value::String(orientation.to_string()),
        );
    } else {
        input.insert(
            "aspect_ratio".to_string(),
            Value::String(request.aspect_ratio.clone()),
        );
        input.insert(
            "output_format".to_string(),
            Value::String(request.output_format.clone()),
        );
        if !request.image_urls.is_empty() {
            input.insert("image_urls".to_string(), json!(request.image_urls));
        }
        if let Some(duration) = request.duration {
            input.insert("duration".to_string(), json!(duration));
        }
    }

    for (key, value) in &request.extra_params {
        if !input.contains_key(key) && !key.starts_with('_') {
            input.insert(key.clone(), value.clone());
        }
    }

    Value::Object(input)
}

/// Translate a kie.ai state string into the canonical task state
fn map_state(state: &str, data: &Value) -> TaskState {
    match state {
        "waiting" | "queuing" => TaskState::Pending,
        "generating" => TaskState::Processing,
        "success" => TaskState::Succeeded {
            result_url: extract_result_url(data),
        },
        "fail" | "failed" => TaskState::Failed {
            error: extract_error(data),
        },
        // Anything unrecognized keeps the poll loop going
        _ => TaskState::Processing,
    }
}

/// Pull the result location out of the record payload. `resultJson` arrives
/// either as an object or as a JSON-encoded string.
fn extract_result_url(data: &Value) -> Option<String> {
    let result_json = match data.get("resultJson") {
        Some(Value::String(raw)) => serde_json::from_str::<Value>(raw).unwrap_or(Value::Null),
        Some(value) => value.clone(),
        None => Value::Null,
    };

    if let Some(url) = result_json
        .get("resultUrls")
        .and_then(Value::as_array)
        .and_then(|urls| urls.first())
        .and_then(Value::as_str)
    {
        return Some(url.to_string());
    }

    for key in ["url", "video_url", "image_url"] {
        if let Some(url) = result_json.get(key).and_then(Value::as_str) {
            return Some(url.to_string());
        }
    }
    for key in ["resultUrl", "url"] {
        if let Some(url) = data.get(key).and_then(Value::as_str) {
            return Some(url.to_string());
        }
    }
    None
}

fn extract_error(data: &Value) -> String {
    for key in ["errorMessage", "error", "failMsg"] {
        if let Some(message) = data.get(key).and_then(Value::as_str) {
            return message.to_string();
        }
    }
    "Generation failed".to_string()
}

#[async_trait]
impl GenerationProvider for KieProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn create_task(&self, request: &TaskRequest) -> Result<TaskHandle> {
        let payload = json!({
            "model": request.model,
            "input": build_input(request),
        });

        info!(model = %request.model, "Creating kie.ai task");

        let response = self
            .request(reqwest::Method::POST, "/jobs/createTask", Some(payload), None)
            .await?;

        let task_id = response
            .get("data")
            .and_then(|d| d.get("taskId"))
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::ExternalService {
                service: PROVIDER_NAME.to_string(),
                message: "No taskId in response".to_string(),
            })?;

        info!(task_id = %task_id, "kie.ai task created");
        Ok(TaskHandle {
            id: task_id.to_string(),
        })
    }

    async fn task_status(&self, task_id: &str) -> Result<TaskState> {
        let response = self
            .request(
                reqwest::Method::GET,
                "/jobs/recordInfo",
                None,
                Some(&[("taskId", task_id)]),
            )
            .await?;

        let data = response.get("data").cloned().unwrap_or(Value::Null);
        let state = data.get("state").and_then(Value::as_str).unwrap_or("unknown");
        let mapped = map_state(state, &data);

        debug!(task_id = %task_id, state = %state, ?mapped, "kie.ai task status");
        Ok(mapped)
    }

    async fn cancel_task(&self, task_id: &str) -> bool {
        // kie.ai exposes no abort endpoint
        debug!(task_id = %task_id, "Task cancellation not supported");
        false
    }
}
