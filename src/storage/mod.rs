//! Persistence ports for balances and generation history.
//!
//! The core talks to durable storage only through the [`CreditStore`] and
//! [`HistoryStore`] traits. Two backends ship with the crate: an in-memory
//! store for tests and single-process deployments, and a filesystem store
//! with an append-only history log per user.

mod fs;
mod memory;

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::history::HistoryEntry;

pub use fs::FsStore;
pub use memory::MemoryStore;

/// Errors from the persistence layer. Fatal to the current transaction;
/// a failed operation leaves no partial mutation behind.
#[derive(Error, Debug)]
pub enum StorageError {
    /// IO error during backend operations.
    #[error("storage IO error: {0}")]
    Io(#[from] io::Error),

    /// Record serialization/deserialization error.
    #[error("storage serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// User identifier not usable as a storage key.
    #[error("invalid user id")]
    InvalidUserId,

    /// Backend-specific failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Outcome of a conditional debit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitOutcome {
    /// Debit applied; holds the new balance.
    Applied(u64),
    /// Balance below the requested amount; holds the unchanged balance.
    Insufficient(u64),
}

/// Durable per-user credit balances.
///
/// Implementations must make `try_debit` a single critical section per user:
/// the read-check-write may never interleave with another debit for the same
/// user, so the balance cannot go negative and two debits cannot both
/// observe funds that only one can afford.
#[async_trait]
pub trait CreditStore: Send + Sync {
    /// Return the balance, creating the record at `initial` on first access.
    /// Idempotent: an existing record is returned unchanged.
    async fn ensure_initialized(&self, user_id: &str, initial: u64) -> StorageResult<u64>;

    /// Atomically debit `amount` if the balance covers it.
    ///
    /// A user without a record reads as a zero balance; callers initialize
    /// the record first via `ensure_initialized`.
    async fn try_debit(&self, user_id: &str, amount: u64) -> StorageResult<DebitOutcome>;

    /// Unconditionally increase the balance, creating the record at zero
    /// first if missing. Returns the new balance.
    async fn credit(&self, user_id: &str, amount: u64) -> StorageResult<u64>;
}

/// Durable append-only generation history.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Persist one entry. Durable once this returns `Ok`.
    async fn append(&self, entry: &HistoryEntry) -> StorageResult<()>;

    /// A user's entries, newest first, bounded by `limit` when given.
    /// Per-user insertion order is preserved.
    async fn recent(&self, user_id: &str, limit: Option<usize>)
        -> StorageResult<Vec<HistoryEntry>>;
}

/// Shared credit store handle.
pub type DynCreditStore = Arc<dyn CreditStore>;

/// Shared history store handle.
pub type DynHistoryStore = Arc<dyn HistoryStore>;

pub(crate) fn validate_user_id(user_id: &str) -> StorageResult<()> {
    if user_id.trim().is_empty() || user_id.contains(['/', '\\', '\0']) {
        return Err(StorageError::InvalidUserId);
    }
    Ok(())
}
