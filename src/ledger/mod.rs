//! Token ledger: atomic balance reservation and credit with an audit trail
//!
//! Consumed by the generation orchestrator (reserve + refund) and by the
//! payment webhook handler (deposit credit). Every mutation is delegated to
//! the store as one atomic operation, so concurrent reservations, refunds,
//! and deposits against the same user never lose an update.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::error::Result;
use crate::models::BalanceOperation;
use crate::storage::{LedgerWrite, Store};

/// Balance mutation front door
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn Store>,
}

impl Ledger {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Reserve `amount` tokens for a generation. Fails closed with
    /// `InsufficientBalance` carrying required vs available; on shortfall no
    /// balance mutation and no audit entry are written.
    pub async fn reserve(
        &self,
        user_id: i64,
        amount: i64,
        description: String,
        generation_id: Uuid,
    ) -> Result<i64> {
        let new_balance = self
            .store
            .try_debit(
                user_id,
                amount,
                LedgerWrite {
                    operation: BalanceOperation::Generation,
                    description,
                    reference_id: Some(generation_id.to_string()),
                },
            )
            .await?;

        debug!(user_id, amount, new_balance, "Tokens reserved");
        Ok(new_balance)
    }

    /// Credit tokens to a user: refunds, deposits, bonuses, admin moves.
    pub async fn credit(
        &self,
        user_id: i64,
        amount: i64,
        operation: BalanceOperation,
        description: String,
        reference_id: Option<String>,
    ) -> Result<i64> {
        let new_balance = self
            .store
            .credit(
                user_id,
                amount,
                LedgerWrite {
                    operation,
                    description,
                    reference_id,
                },
            )
            .await?;

        info!(user_id, amount, new_balance, ?operation, "Tokens credited");
        Ok(new_balance)
    }

    pub async fn balance(&self, user_id: i64) -> Result<i64> {
        self.store.balance(user_id).await
    }
}
