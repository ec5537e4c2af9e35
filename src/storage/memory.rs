//! In-memory store implementation
//!
//! Balance mutations for one user happen under that user's dashmap entry
//! guard, so a debit check-and-decrement and its audit append are one atomic
//! step, matching what a SQL store does with an atomic `UPDATE .. RETURNING`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{
    BalanceEntry, GalleryItem, Generation, GenerationStatus, MediaType, ModelConfig,
};
use crate::storage::{LedgerWrite, Store};

#[derive(Debug, Default)]
struct Account {
    balance: i64,
    history: Vec<BalanceEntry>,
}

impl Account {
    fn append(&mut self, user_id: i64, amount: i64, entry: LedgerWrite) {
        self.history.push(BalanceEntry {
            user_id,
            amount,
            balance_after: self.balance,
            operation: entry.operation,
            description: entry.description,
            reference_id: entry.reference_id,
            created_at: Utc::now(),
        });
    }
}

/// Concurrent in-process store
#[derive(Default)]
pub struct MemoryStore {
    accounts: DashMap<i64, Account>,
    generations: DashMap<Uuid, Generation>,
    // Keyed by generation id: at most one gallery item per generation
    gallery: DashMap<Uuid, GalleryItem>,
    models: RwLock<HashMap<String, ModelConfig>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn model_by_code(&self, code: &str) -> Result<Option<ModelConfig>> {
        Ok(self.models.read().get(code).cloned())
    }

    async fn list_models(&self, enabled_only: bool) -> Result<Vec<ModelConfig>> {
        let mut models: Vec<ModelConfig> = self
            .models
            .read()
            .values()
            .filter(|m| !enabled_only || m.enabled)
            .cloned()
            .collect();
        models.sort_by_key(|m| m.sort_order);
        Ok(models)
    }

    async fn upsert_model(&self, model: ModelConfig) -> Result<()> {
        self.models.write().insert(model.code.clone(), model);
        Ok(())
    }

    async fn insert_generation(&self, generation: &Generation) -> Result<()> {
        self.generations.insert(generation.id, generation.clone());
        Ok(())
    }

    async fn generation(&self, id: Uuid) -> Result<Option<Generation>> {
        Ok(self.generations.get(&id).map(|g| g.clone()))
    }

    async fn list_generations(
        &self,
        user_id: i64,
        offset: usize,
        limit: usize,
        media_type: Option<MediaType>,
    ) -> Result<Vec<Generation>> {
        let mut generations: Vec<Generation> = self
            .generations
            .iter()
            .filter(|g| g.user_id == user_id)
            .filter(|g| media_type.map_or(true, |t| g.media_type == t))
            .map(|g| g.clone())
            .collect();
        generations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(generations.into_iter().skip(offset).take(limit).collect())
    }

    async fn mark_processing(&self, id: Uuid, provider_task_id: &str) -> Result<bool> {
        let mut generation = self
            .generations
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("Generation", id.to_string()))?;

        if generation.status != GenerationStatus::Pending {
            return Ok(false);
        }
        generation.status = GenerationStatus::Processing;
        generation.provider_task_id = Some(provider_task_id.to_string());
        Ok(true)
    }

    async fn mark_success(
        &self,
        id: Uuid,
        result_url: &str,
        result_file_path: Option<&str>,
    ) -> Result<bool> {
        let mut generation = self
            .generations
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("Generation", id.to_string()))?;

        if generation.status.is_terminal() {
            return Ok(false);
        }
        generation.status = GenerationStatus::Success;
        generation.result_url = Some(result_url.to_string());
        generation.result_file_path = result_file_path.map(String::from);
        generation.completed_at = Some(Utc::now());
        Ok(true)
    }

    async fn mark_failed(&self, id: Uuid, error_message: &str) -> Result<bool> {
        let mut generation = self
            .generations
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("Generation", id.to_string()))?;

        if generation.status.is_terminal() {
            return Ok(false);
        }
        generation.status = GenerationStatus::Failed;
        generation.error_message = Some(error_message.to_string());
        generation.completed_at = Some(Utc::now());
        Ok(true)
    }

    async fn insert_gallery_item(&self, item: &GalleryItem) -> Result<()> {
        self.gallery.insert(item.generation_id, item.clone());
        Ok(())
    }

    async fn gallery_item_for(&self, generation_id: Uuid) -> Result<Option<GalleryItem>> {
        Ok(self.gallery.get(&generation_id).map(|i| i.clone()))
    }

    async fn balance(&self, user_id: i64) -> Result<i64> {
        Ok(self.accounts.get(&user_id).map_or(0, |a| a.balance))
    }

    async fn try_debit(&self, user_id: i64, amount: i64, entry: LedgerWrite) -> Result<i64> {
        let mut account = self.accounts.entry(user_id).or_default();

        if account.balance < amount {
            return Err(AppError::InsufficientBalance {
                required: amount,
                available: account.balance,
            });
        }
        account.balance -= amount;
        let new_balance = account.balance;
        account.append(user_id, -amount, entry);
        Ok(new_balance)
    }

    async fn credit(&self, user_id: i64, amount: i64, entry: LedgerWrite) -> Result<i64> {
        let mut account = self.accounts.entry(user_id).or_default();

        account.balance += amount;
        let new_balance = account.balance;
        account.append(user_id, amount, entry);
        Ok(new_balance)
    }

    async fn balance_history(&self, user_id: i64) -> Result<Vec<BalanceEntry>> {
        Ok(self
            .accounts
            .get(&user_id)
            .map(|a| a.history.clone())
            .unwrap_or_default())
    }
}
