//! Generation orchestrator: the per-request state machine
//!
//! Synchronous phase: validate → price → reserve → persist the pending
//! record, then hand the rest to a detached unit and return to the caller.
//! Detached phase: dispatch to the provider, poll to resolution, download
//! the artifact on success, refund on failure. Terminal transitions are
//! compare-and-set in the store; the first writer wins and refund plus
//! notification only follow an applied transition.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::artifact::ArtifactDownloader;
use crate::config::PollingConfig;
use crate::error::{AppError, Result};
use crate::ledger::Ledger;
use crate::models::{BalanceOperation, GalleryItem, Generation, MediaType, ModelConfig, NewGeneration};
use crate::notify::{notify_best_effort, GenerationEvent, Notifier};
use crate::pricing;
use crate::provider::{GenerationProvider, ProviderRegistry, TaskRequest, TaskState};
use crate::storage::Store;
use crate::supervisor::TaskSupervisor;

/// Drives every generation from acceptance to terminal state
pub struct GenerationService {
    store: Arc<dyn Store>,
    ledger: Ledger,
    providers: Arc<ProviderRegistry>,
    supervisor: Arc<TaskSupervisor>,
    downloader: Arc<ArtifactDownloader>,
    notifier: Arc<dyn Notifier>,
    polling: PollingConfig,
}

impl GenerationService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn Store>,
        ledger: Ledger,
        providers: Arc<ProviderRegistry>,
        supervisor: Arc<TaskSupervisor>,
        downloader: Arc<ArtifactDownloader>,
        notifier: Arc<dyn Notifier>,
        polling: PollingConfig,
    ) -> Self {
        Self {
            store,
            ledger,
            providers,
            supervisor,
            downloader,
            notifier,
            polling,
        }
    }

    pub fn supervisor(&self) -> &Arc<TaskSupervisor> {
        &self.supervisor
    }

    /// Accept a generation request. Validation and the balance reservation
    /// happen synchronously; everything after the pending record is
    /// persisted runs detached.
    pub async fn create_generation(self: &Arc<Self>, request: NewGeneration) -> Result<Generation> {
        let model = self
            .store
            .model_by_code(&request.model_code)
            .await?
            .ok_or_else(|| AppError::NotFound("Model", request.model_code.clone()))?;

        // Capability checks fail before any token is touched
        pricing::validate_request(&model, &request)?;

        // A model bound to an unregistered provider must not reach the
        // ledger either
        let provider = self.providers.get(&model.provider)?;

        let cost = pricing::resolve_cost(&model, request.duration);
        let generation = Generation::new(&request, &model, cost);

        self.ledger
            .reserve(
                request.user_id,
                cost,
                format!("Generation: {}", model.name),
                generation.id,
            )
            .await?;

        if let Err(e) = self.store.insert_generation(&generation).await {
            // Reservation already happened; hand the tokens back before
            // surfacing the failure
            self.refund(&generation, "Refund for unpersisted generation").await;
            return Err(e);
        }

        let service = Arc::clone(self);
        let detached = generation.clone();
        self.supervisor.spawn(generation.id, async move {
            service.run(detached, model, provider).await;
        });

        info!(
            generation_id = %generation.id,
            user_id = request.user_id,
            model = %request.model_code,
            tokens = cost,
            "Generation started"
        );

        Ok(generation)
    }

    /// Detached phase: dispatch and poll to resolution
    async fn run(
        &self,
        generation: Generation,
        model: ModelConfig,
        provider: Arc<dyn GenerationProvider>,
    ) {
        let task_request = TaskRequest {
            model: model.provider_model.clone(),
            prompt: generation.prompt.clone(),
            image_urls: generation.image_url.clone().into_iter().collect(),
            video_urls: generation.video_url.clone().into_iter().collect(),
            aspect_ratio: generation.aspect_ratio.clone(),
            duration: generation.duration,
            output_format: generation.media_type.output_format().to_string(),
            extra_params: generation.extra_params.clone(),
        };

        let handle = match provider.create_task(&task_request).await {
            Ok(handle) => handle,
            Err(e) => {
                // No provider-side task exists; fail directly from pending
                self.resolve_failed(&generation, format!("Provider dispatch failed: {}", e))
                    .await;
                return;
            }
        };

        match self.store.mark_processing(generation.id, &handle.id).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(generation_id = %generation.id, "Generation already terminal before dispatch was recorded");
                return;
            }
            Err(e) => {
                error!(generation_id = %generation.id, error = %e, "Failed to record dispatch");
                return;
            }
        }

        self.poll(&generation, provider.as_ref(), &handle.id).await;
    }

    /// Poll the provider on a fixed interval within the attempt budget
    async fn poll(&self, generation: &Generation, provider: &dyn GenerationProvider, task_id: &str) {
        let interval = Duration::from_millis(self.polling.interval_ms);

        for attempt in 1..=self.polling.max_attempts {
            tokio::time::sleep(interval).await;

            match provider.task_status(task_id).await {
                Ok(TaskState::Pending) | Ok(TaskState::Processing) => {
                    debug!(generation_id = %generation.id, attempt, "Generation still in flight");
                }
                Ok(TaskState::Succeeded { result_url: Some(url) }) => {
                    self.resolve_success(generation, &url).await;
                    return;
                }
                Ok(TaskState::Succeeded { result_url: None }) => {
                    self.resolve_failed(
                        generation,
                        "Provider reported success without a result".to_string(),
                    )
                    .await;
                    return;
                }
                Ok(TaskState::Failed { error }) => {
                    self.resolve_failed(generation, error).await;
                    return;
                }
                Err(e) => {
                    // Transient poll errors do not end the generation
                    warn!(generation_id = %generation.id, attempt, error = %e, "Status poll failed");
                }
            }
        }

        self.resolve_failed(generation, "Timed out waiting for the provider".to_string())
            .await;
    }

    /// Success path: artifact download, terminal transition, gallery,
    /// notification
    async fn resolve_success(&self, generation: &Generation, result_url: &str) {
        let file_path = match self.downloader.download(generation.id, result_url).await {
            Ok(path) => path,
            Err(e) => {
                self.resolve_failed(generation, format!("Result download failed: {}", e))
                    .await;
                return;
            }
        };

        let applied = match self
            .store
            .mark_success(generation.id, result_url, Some(&file_path))
            .await
        {
            Ok(applied) => applied,
            Err(e) => {
                error!(generation_id = %generation.id, error = %e, "Failed to persist success");
                return;
            }
        };
        if !applied {
            warn!(generation_id = %generation.id, "Late success after terminal state, ignoring");
            return;
        }

        let item = GalleryItem::for_generation(generation, file_path.clone());
        if let Err(e) = self.store.insert_gallery_item(&item).await {
            error!(generation_id = %generation.id, error = %e, "Failed to create gallery item");
        }

        notify_best_effort(
            self.notifier.as_ref(),
            generation.user_id,
            GenerationEvent::Completed {
                generation_id: generation.id,
                result_file_path: Some(file_path),
            },
        )
        .await;

        info!(generation_id = %generation.id, "Generation completed");
    }

    /// Failure path: terminal transition first, then exactly one refund.
    /// When the transition did not apply another path already resolved this
    /// generation and nothing more happens here.
    async fn resolve_failed(&self, generation: &Generation, message: String) {
        let applied = match self.store.mark_failed(generation.id, &message).await {
            Ok(applied) => applied,
            Err(e) => {
                error!(generation_id = %generation.id, error = %e, "Failed to persist failure");
                return;
            }
        };
        if !applied {
            debug!(generation_id = %generation.id, "Generation already terminal, skipping refund");
            return;
        }

        warn!(generation_id = %generation.id, error = %message, "Generation failed");

        self.refund(generation, "Refund for failed generation").await;

        notify_best_effort(
            self.notifier.as_ref(),
            generation.user_id,
            GenerationEvent::Failed {
                generation_id: generation.id,
                reason: message,
                tokens_refunded: generation.tokens_spent,
            },
        )
        .await;
    }

    async fn refund(&self, generation: &Generation, description: &str) {
        let result = self
            .ledger
            .credit(
                generation.user_id,
                generation.tokens_spent,
                BalanceOperation::Refund,
                description.to_string(),
                Some(generation.id.to_string()),
            )
            .await;

        if let Err(e) = result {
            error!(generation_id = %generation.id, error = %e, "Refund failed");
        }
    }

    /// Fetch a generation, scoped to its owner
    pub async fn get_generation(&self, id: Uuid, user_id: i64) -> Result<Generation> {
        let generation = self
            .store
            .generation(id)
            .await?
            .filter(|g| g.user_id == user_id)
            .ok_or_else(|| AppError::NotFound("Generation", id.to_string()))?;
        Ok(generation)
    }

    pub async fn list_generations(
        &self,
        user_id: i64,
        offset: usize,
        limit: usize,
        media_type: Option<MediaType>,
    ) -> Result<Vec<Generation>> {
        self.store
            .list_generations(user_id, offset, limit, media_type)
            .await
    }

    /// Best-effort cancel. No integrated provider supports a genuine remote
    /// abort, so this only asks the adapter and reports what it claims; the
    /// poll loop keeps running to natural resolution either way.
    pub async fn cancel_generation(&self, id: Uuid, user_id: i64) -> Result<bool> {
        let generation = self.get_generation(id, user_id).await?;

        let Some(task_id) = generation.provider_task_id else {
            return Ok(false);
        };
        let model = self
            .store
            .model_by_code(&generation.model_code)
            .await?
            .ok_or_else(|| AppError::NotFound("Model", generation.model_code.clone()))?;
        let provider = self.providers.get(&model.provider)?;

        Ok(provider.cancel_task(&task_id).await)
    }
}
