//! Artifact retrieval and durable storage for completed generations

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Downloads provider result files into local storage
pub struct ArtifactDownloader {
    client: Client,
    base_path: PathBuf,
}

impl ArtifactDownloader {
    /// Build a downloader with its own bounded timeout, independent of the
    /// orchestrator's poll budget.
    pub fn new(base_path: String, timeout_ms: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_path: PathBuf::from(base_path).join("generations"),
        })
    }

    /// Fetch the artifact at `url` and persist it as
    /// `{generation_id}.{ext}`. Returns the stored path.
    pub async fn download(&self, generation_id: Uuid, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::Download(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::Download(format!(
                "Artifact fetch returned {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::Download(e.to_string()))?;

        fs::create_dir_all(&self.base_path).await?;

        let file_name = format!("{}.{}", generation_id, extension_for(url));
        let file_path = self.base_path.join(&file_name);
        fs::write(&file_path, &bytes).await?;

        debug!(generation_id = %generation_id, path = ?file_path, size = bytes.len(), "Result downloaded");

        Ok(file_path.to_string_lossy().to_string())
    }
}

/// Infer a file extension from the result URL
fn extension_for(url: &str) -> &'static str {
    if url.contains(".mp4") || url.contains("video") {
        "mp4"
    } else if url.contains(".webp") {
        "webp"
    } else if url.contains(".jpg") || url.contains(".jpeg") {
        "jpg"
    } else {
        "png"
    }
}
