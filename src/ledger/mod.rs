//! Per-user credit accounting.
//!
//! The ledger owns all balance mutation. Balances are created lazily at the
//! configured initial value, never go negative, and every debit is a single
//! atomic check-and-set delegated to the storage backend.

use thiserror::Error;
use tracing::debug;

use crate::storage::{DebitOutcome, DynCreditStore, StorageError};

/// Errors from ledger operations.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Balance below the requested debit. A normal, locally recoverable
    /// outcome; the balance is left unchanged.
    #[error("insufficient credits: balance {balance}, requested {requested}")]
    InsufficientCredits {
        /// The unchanged balance at the time of the rejected debit.
        balance: u64,
        /// The amount that was requested.
        requested: u64,
    },

    /// Storage failure; the debit either fully applied or not at all.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Credit ledger over a [`crate::storage::CreditStore`] backend.
#[derive(Clone)]
pub struct CreditLedger {
    store: DynCreditStore,
    initial_balance: u64,
}

impl CreditLedger {
    /// Create a ledger granting `initial_balance` to first-seen users.
    pub fn new(store: DynCreditStore, initial_balance: u64) -> Self {
        Self {
            store,
            initial_balance,
        }
    }

    /// Read the balance, initializing first-seen users. Idempotent.
    pub async fn balance(&self, user_id: &str) -> Result<u64, StorageError> {
        self.store
            .ensure_initialized(user_id, self.initial_balance)
            .await
    }

    /// Atomically debit `amount`, returning the new balance.
    pub async fn try_debit(&self, user_id: &str, amount: u64) -> Result<u64, LedgerError> {
        self.store
            .ensure_initialized(user_id, self.initial_balance)
            .await?;

        match self.store.try_debit(user_id, amount).await? {
            DebitOutcome::Applied(balance) => {
                debug!(user_id, amount, balance, "debited credits");
                Ok(balance)
            }
            DebitOutcome::Insufficient(balance) => Err(LedgerError::InsufficientCredits {
                balance,
                requested: amount,
            }),
        }
    }

    /// Unconditionally add `amount` (top-ups, refunds). Never invoked
    /// automatically by the generation core.
    pub async fn credit(&self, user_id: &str, amount: u64) -> Result<u64, StorageError> {
        self.store
            .ensure_initialized(user_id, self.initial_balance)
            .await?;
        let balance = self.store.credit(user_id, amount).await?;
        debug!(user_id, amount, balance, "credited balance");
        Ok(balance)
    }
}
