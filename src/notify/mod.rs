//! Notification sink for resolved generations
//!
//! Fire-and-forget: a delivery failure is logged and never rolls back the
//! generation's terminal state.

use async_trait::async_trait;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::Result;

/// Event delivered to a user when their generation resolves
#[derive(Debug, Clone)]
pub enum GenerationEvent {
    Completed {
        generation_id: Uuid,
        result_file_path: Option<String>,
    },
    Failed {
        generation_id: Uuid,
        reason: String,
        tokens_refunded: i64,
    },
}

/// Message delivery contract; the real transport lives outside this crate
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: i64, event: GenerationEvent) -> Result<()>;
}

/// Deliver a notification, swallowing and logging any failure
pub async fn notify_best_effort(notifier: &dyn Notifier, user_id: i64, event: GenerationEvent) {
    if let Err(e) = notifier.notify(user_id, event).await {
        warn!(user_id, error = %e, "Notification delivery failed");
    }
}

/// Default sink that only logs; stands in until a transport is wired up
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, user_id: i64, event: GenerationEvent) -> Result<()> {
        info!(user_id, ?event, "Notifying user");
        Ok(())
    }
}
