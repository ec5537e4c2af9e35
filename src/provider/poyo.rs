//! poyo.ai adapter
//!
//! Flat task API: `POST /v1/tasks`, `GET /v1/tasks/{id}`,
//! `POST /v1/tasks/{id}/cancel`. Responses are plain JSON objects without an
//! envelope; field names vary between deployments, so the adapter probes a
//! few known spellings.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::config::ProviderSettings;
use crate::error::{AppError, Result};
use crate::provider::traits::{GenerationProvider, TaskHandle, TaskRequest, TaskState};

const PROVIDER_NAME: &str = "poyo";

/// poyo.ai API adapter
pub struct PoyoProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PoyoProvider {
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
    ) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);

        let mut builder = self
            .client
            .request(method, &url)
            .bearer_auth(&self.api_key);
        if let Some(body) = body {
            builder = builder.json(&body);
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

        debug!(endpoint = %path, status = %status, "poyo.ai response");

        if !status.is_success() {
            let message = payload
                .get("message")
                .or_else(|| payload.get("error"))
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

/// Translate a poyo.ai status string into the canonical task state
fn map_state(state: &str, payload: &Value) -> TaskState {
    match state {
        "waiting" | "queued" | "pending" => TaskState::Pending,
        "processing" | "running" => TaskState::Processing,
        "completed" | "success" | "done" => TaskState::Succeeded {
            result_url: extract_result_url(payload),
        },
        "failed" | "error" => TaskState::Failed {
            error: extract_error(payload),
        },
        _ => TaskState::Processing,
    }
}

fn extract_result_url(payload: &Value) -> Option<String> {
    for key in ["result_url", "output_url", "url"] {
        if let Some(url) = payload.get(key).and_then(Value::as_str) {
            return Some(url.to_string());
        }
    }
    if let Some(url) = payload
        .get("result")
        .and_then(|r| r.get("url"))
        .and_then(Value::as_str)
    {
        return Some(url.to_string());
    }
    payload
        .get("output")
        .and_then(Value::as_array)
        .and_then(|o| o.first())
        .and_then(Value::as_str)
        .map(String::from)
}

fn extract_error(payload: &Value) -> String {
    for key in ["error", "error_message", "message"] {
        if let Some(message) = payload.get(key).and_then(Value::as_str) {
            return message.to_string();
        }
    }
    "Generation failed".to_string()
}

#[async_trait]
impl GenerationProvider for PoyoProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn create_task(&self, request: &TaskRequest) -> Result<TaskHandle> {
        let mut body = Map::new();
        body.insert("model".to_string(), Value::String(request.model.clone()));
        body.insert(
            "prompt".to_string(),
            Value::String(request.prompt.clone().unwrap_or_default()),
        );
        body.insert(
            "aspect_ratio".to_string(),
            Value::String(request.aspect_ratio.clone()),
        );
        if !request.image_urls.is_empty() {
            body.insert("image_urls".to_string(), json!(request.image_urls));
        }
        if let Some(duration) = request.duration {
            body.insert("duration".to_string(), json!(duration));
        }
        for (key, value) in &request.extra_params {
            body.entry(key.clone()).or_insert_with(|| value.clone());
        }

        debug!(model = %request.model, "Creating poyo.ai task");

        let response = self
            .request(reqwest::Method::POST, "/v1/tasks", Some(Value::Object(body)))
            .await?;

        let task_id = response
            .get("task_id")
            .or_else(|| response.get("id"))
            .and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .ok_or_else(|| AppError::ExternalService {
                service: PROVIDER_NAME.to_string(),
                message: "No task_id in response".to_string(),
            })?;

        info!(task_id = %task_id, "poyo.ai task created");
        Ok(TaskHandle { id: task_id })
    }

    async fn task_status(&self, task_id: &str) -> Result<TaskState> {
        let response = self
            .request(reqwest::Method::GET, &format!("/v1/tasks/{}", task_id), None)
            .await?;

        let state = response
            .get("status")
            .or_else(|| response.get("state"))
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        let mapped = map_state(state, &response);

        debug!(task_id = %task_id, state = %state, ?mapped, "poyo.ai task status");
        Ok(mapped)
    }

    async fn cancel_task(&self, task_id: &str) -> bool {
        let result = self
            .request(
                reqwest::Method::POST,
                &format!("/v1/tasks/{}/cancel", task_id),
                None,
            )
            .await;

        match result {
            Ok(_) => true,
            Err(_) => {
                debug!(task_id = %task_id, "poyo.ai task cancellation failed");
                false
            }
        }
    }
}
