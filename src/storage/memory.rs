//! In-memory store for tests and single-process deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::history::HistoryEntry;
use crate::storage::{
    validate_user_id, CreditStore, DebitOutcome, HistoryStore, StorageResult,
};

/// Volatile implementation of both storage ports.
///
/// One mutex guards the whole balance map, which trivially serializes the
/// per-user read-check-write; a backend under real contention would shard
/// the critical section per user instead.
#[derive(Debug, Default)]
pub struct MemoryStore {
    balances: Mutex<HashMap<String, u64>>,
    history: Mutex<HashMap<String, Vec<HistoryEntry>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CreditStore for MemoryStore {
    async fn ensure_initialized(&self, user_id: &str, initial: u64) -> StorageResult<u64> {
        validate_user_id(user_id)?;
        let mut balances = self.balances.lock().await;
        Ok(*balances.entry(user_id.to_string()).or_insert(initial))
    }

    async fn try_debit(&self, user_id: &str, amount: u64) -> StorageResult<DebitOutcome> {
        validate_user_id(user_id)?;
        let mut balances = self.balances.lock().await;
        let Some(balance) = balances.get_mut(user_id) else {
            return Ok(DebitOutcome::Insufficient(0));
        };
        if *balance < amount {
            return Ok(DebitOutcome::Insufficient(*balance));
        }
        *balance -= amount;
        Ok(DebitOutcome::Applied(*balance))
    }

    async fn credit(&self, user_id: &str, amount: u64) -> StorageResult<u64> {
        validate_user_id(user_id)?;
        let mut balances = self.balances.lock().await;
        let balance = balances.entry(user_id.to_string()).or_insert(0);
        *balance = balance.saturating_add(amount);
        Ok(*balance)
    }
}

#[async_trait]
impl HistoryStore for MemoryStore {
    async fn append(&self, entry: &HistoryEntry) -> StorageResult<()> {
        validate_user_id(&entry.user_id)?;
        let mut history = self.history.lock().await;
        history
            .entry(entry.user_id.clone())
            .or_default()
            .push(entry.clone());
        Ok(())
    }

    async fn recent(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> StorageResult<Vec<HistoryEntry>> {
        validate_user_id(user_id)?;
        let history = self.history.lock().await;
        let Some(entries) = history.get(user_id) else {
            return Ok(Vec::new());
        };
        let bound = limit.unwrap_or(entries.len());
        Ok(entries.iter().rev().take(bound).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentKind;
    use crate::storage::StorageError;

    #[tokio::test]
    async fn test_ensure_initialized_is_idempotent() {
        let store = MemoryStore::new();
        let first = store.ensure_initialized("user-1", 50).await.expect("init");
        let second = store.ensure_initialized("user-1", 99).await.expect("init");
        assert_eq!(first, 50);
        assert_eq!(second, 50);
    }

    #[tokio::test]
    async fn test_debit_at_exact_balance_succeeds() {
        let store = MemoryStore::new();
        store.ensure_initialized("user-1", 5).await.expect("init");
        let outcome = store.try_debit("user-1", 5).await.expect("debit");
        assert_eq!(outcome, DebitOutcome::Applied(0));
    }

    #[tokio::test]
    async fn test_debit_below_balance_is_rejected_unchanged() {
        let store = MemoryStore::new();
        store.ensure_initialized("user-1", 3).await.expect("init");
        let outcome = store.try_debit("user-1", 5).await.expect("debit");
        assert_eq!(outcome, DebitOutcome::Insufficient(3));

        let balance = store.ensure_initialized("user-1", 3).await.expect("read");
        assert_eq!(balance, 3);
    }

    #[tokio::test]
    async fn test_debit_on_missing_user_reads_zero() {
        let store = MemoryStore::new();
        let outcome = store.try_debit("ghost", 1).await.expect("debit");
        assert_eq!(outcome, DebitOutcome::Insufficient(0));
    }

    #[tokio::test]
    async fn test_credit_tops_up() {
        let store = MemoryStore::new();
        store.ensure_initialized("user-1", 10).await.expect("init");
        let balance = store.credit("user-1", 25).await.expect("credit");
        assert_eq!(balance, 35);
    }

    #[tokio::test]
    async fn test_invalid_user_id_is_rejected() {
        let store = MemoryStore::new();
        let err = store.ensure_initialized("  ", 10).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidUserId));
    }

    #[tokio::test]
    async fn test_recent_returns_newest_first_with_limit() {
        let store = MemoryStore::new();
        for n in 0..4 {
            let entry = HistoryEntry::new(
                "user-1",
                ContentKind::Linkedin,
                format!("prompt {n}"),
                &[format!("post {n}")],
            );
            store.append(&entry).await.expect("append");
        }

        let all = store.recent("user-1", None).await.expect("recent");
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].prompt, "prompt 3");
        assert_eq!(all[3].prompt, "prompt 0");

        let bounded = store.recent("user-1", Some(2)).await.expect("recent");
        assert_eq!(bounded.len(), 2);
        assert_eq!(bounded[0].prompt, "prompt 3");
        assert_eq!(bounded[1].prompt, "prompt 2");
    }

    #[tokio::test]
    async fn test_recent_for_unknown_user_is_empty() {
        let store = MemoryStore::new();
        let entries = store.recent("nobody", None).await.expect("recent");
        assert!(entries.is_empty());
    }
}
