//! Persistence abstraction for generations, gallery, models, and balances
//!
//! The orchestrator and ledger only talk to the [`Store`] trait; the bundled
//! [`memory::MemoryStore`] backs the in-process service and the test suites.
//! A SQL-backed store must honor the same contracts, in particular the
//! atomic balance adjustment and the compare-and-set status transitions.

pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    BalanceEntry, BalanceOperation, GalleryItem, Generation, MediaType, ModelConfig,
};

/// Audit fields accompanying a balance mutation
#[derive(Debug, Clone)]
pub struct LedgerWrite {
    pub operation: BalanceOperation,
    pub description: String,
    pub reference_id: Option<String>,
}

/// Persistence contract consumed by the orchestrator and the ledger
#[async_trait]
pub trait Store: Send + Sync {
    // --- model catalog ---

    async fn model_by_code(&self, code: &str) -> Result<Option<ModelConfig>>;

    async fn list_models(&self, enabled_only: bool) -> Result<Vec<ModelConfig>>;

    async fn upsert_model(&self, model: ModelConfig) -> Result<()>;

    // --- generations ---

    async fn insert_generation(&self, generation: &Generation) -> Result<()>;

    async fn generation(&self, id: Uuid) -> Result<Option<Generation>>;

    async fn list_generations(
        &self,
        user_id: i64,
        offset: usize,
        limit: usize,
        media_type: Option<MediaType>,
    ) -> Result<Vec<Generation>>;

    /// Record the provider task handle and move pending → processing.
    /// Returns whether the transition applied.
    async fn mark_processing(&self, id: Uuid, provider_task_id: &str) -> Result<bool>;

    /// Terminal success transition. Applies only from a non-terminal status;
    /// returns whether it applied, so a late competing transition is a no-op.
    async fn mark_success(
        &self,
        id: Uuid,
        result_url: &str,
        result_file_path: Option<&str>,
    ) -> Result<bool>;

    /// Terminal failure transition, same first-writer-wins contract.
    async fn mark_failed(&self, id: Uuid, error_message: &str) -> Result<bool>;

    // --- gallery ---

    async fn insert_gallery_item(&self, item: &GalleryItem) -> Result<()>;

    async fn gallery_item_for(&self, generation_id: Uuid) -> Result<Option<GalleryItem>>;

    // --- balances ---

    async fn balance(&self, user_id: i64) -> Result<i64>;

    /// Atomically debit `amount` if the balance covers it, appending the
    /// audit entry in the same operation. Fails closed with
    /// [`crate::error::AppError::InsufficientBalance`] and writes nothing on
    /// a shortfall. Returns the new balance.
    async fn try_debit(&self, user_id: i64, amount: i64, entry: LedgerWrite) -> Result<i64>;

    /// Atomically credit `amount` and append the audit entry. Returns the
    /// new balance.
    async fn credit(&self, user_id: i64, amount: i64, entry: LedgerWrite) -> Result<i64>;

    async fn balance_history(&self, user_id: i64) -> Result<Vec<BalanceEntry>>;
}
