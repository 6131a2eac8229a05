//! Filesystem-backed store.
//!
//! Layout: one directory per user under the data root, holding a balance
//! manifest (`balance.json`, rewritten atomically via temp-file rename) and
//! an append-only history log (`history.jsonl`, one record per line).

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::history::HistoryEntry;
use crate::storage::{
    validate_user_id, CreditStore, DebitOutcome, HistoryStore, StorageResult,
};

const DATA_DIR_NAME: &str = ".postforge";
const USERS_DIR_NAME: &str = "users";
const BALANCE_FILE_NAME: &str = "balance.json";
const HISTORY_FILE_NAME: &str = "history.jsonl";

/// Balance manifest persisted per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BalanceRecord {
    user_id: String,
    credits: u64,
    updated_at: DateTime<Utc>,
}

/// Filesystem implementation of both storage ports.
pub struct FsStore {
    root_dir: PathBuf,
    /// Serializes balance read-check-write cycles.
    balance_lock: Mutex<()>,
}

impl FsStore {
    /// Create a store rooted at the given base directory.
    pub fn new(base_dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let root_dir = base_dir.into().join(DATA_DIR_NAME);
        fs::create_dir_all(root_dir.join(USERS_DIR_NAME))?;
        Ok(Self {
            root_dir,
            balance_lock: Mutex::new(()),
        })
    }

    /// The store's root directory path.
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn user_dir(&self, user_id: &str) -> PathBuf {
        self.root_dir.join(USERS_DIR_NAME).join(user_id)
    }

    fn read_balance(&self, path: &Path) -> StorageResult<Option<BalanceRecord>> {
        match fs::read_to_string(path) {
            Ok(content) => {
                let record = serde_json::from_str(&content)?;
                Ok(Some(record))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write_balance(&self, user_dir: &Path, record: &BalanceRecord) -> StorageResult<()> {
        fs::create_dir_all(user_dir)?;
        let json = serde_json::to_string_pretty(record)?;
        let temp_path = user_dir.join(format!("{}.tmp", BALANCE_FILE_NAME));
        let final_path = user_dir.join(BALANCE_FILE_NAME);

        let mut file = fs::File::create(&temp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        fs::rename(&temp_path, &final_path)?;

        Ok(())
    }
}

#[async_trait]
impl CreditStore for FsStore {
    async fn ensure_initialized(&self, user_id: &str, initial: u64) -> StorageResult<u64> {
        validate_user_id(user_id)?;
        let _guard = self.balance_lock.lock().await;

        let user_dir = self.user_dir(user_id);
        let path = user_dir.join(BALANCE_FILE_NAME);
        if let Some(record) = self.read_balance(&path)? {
            return Ok(record.credits);
        }

        let record = BalanceRecord {
            user_id: user_id.to_string(),
            credits: initial,
            updated_at: Utc::now(),
        };
        self.write_balance(&user_dir, &record)?;
        Ok(initial)
    }

    async fn try_debit(&self, user_id: &str, amount: u64) -> StorageResult<DebitOutcome> {
        validate_user_id(user_id)?;
        let _guard = self.balance_lock.lock().await;

        let user_dir = self.user_dir(user_id);
        let path = user_dir.join(BALANCE_FILE_NAME);
        let Some(mut record) = self.read_balance(&path)? else {
            return Ok(DebitOutcome::Insufficient(0));
        };
        if record.credits < amount {
            return Ok(DebitOutcome::Insufficient(record.credits));
        }

        record.credits -= amount;
        record.updated_at = Utc::now();
        self.write_balance(&user_dir, &record)?;
        Ok(DebitOutcome::Applied(record.credits))
    }

    async fn credit(&self, user_id: &str, amount: u64) -> StorageResult<u64> {
        validate_user_id(user_id)?;
        let _guard = self.balance_lock.lock().await;

        let user_dir = self.user_dir(user_id);
        let path = user_dir.join(BALANCE_FILE_NAME);
        let mut record = self.read_balance(&path)?.unwrap_or(BalanceRecord {
            user_id: user_id.to_string(),
            credits: 0,
            updated_at: Utc::now(),
        });

        record.credits = record.credits.saturating_add(amount);
        record.updated_at = Utc::now();
        self.write_balance(&user_dir, &record)?;
        Ok(record.credits)
    }
}

#[async_trait]
impl HistoryStore for FsStore {
    async fn append(&self, entry: &HistoryEntry) -> StorageResult<()> {
        validate_user_id(&entry.user_id)?;

        let user_dir = self.user_dir(&entry.user_id);
        fs::create_dir_all(&user_dir)?;

        let path = user_dir.join(HISTORY_FILE_NAME);
        let mut file = fs::OpenOptions::new().create(true).append(true).open(&path)?;

        let json = serde_json::to_string(entry)?;
        writeln!(file, "{}", json)?;
        file.sync_all()?;

        Ok(())
    }

    async fn recent(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> StorageResult<Vec<HistoryEntry>> {
        validate_user_id(user_id)?;

        let path = self.user_dir(user_id).join(HISTORY_FILE_NAME);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut entries = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let entry: HistoryEntry = serde_json::from_str(line)?;
            entries.push(entry);
        }

        let bound = limit.unwrap_or(entries.len());
        Ok(entries.into_iter().rev().take(bound).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentKind;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_initialize_writes_manifest() {
        let temp_dir = TempDir::new().expect("temp dir");
        let store = FsStore::new(temp_dir.path()).expect("store");

        let balance = store.ensure_initialized("user-1", 50).await.expect("init");
        assert_eq!(balance, 50);
        assert!(store
            .root_dir()
            .join(USERS_DIR_NAME)
            .join("user-1")
            .join(BALANCE_FILE_NAME)
            .exists());
    }

    #[tokio::test]
    async fn test_initialize_survives_reopen() {
        let temp_dir = TempDir::new().expect("temp dir");
        {
            let store = FsStore::new(temp_dir.path()).expect("store");
            store.ensure_initialized("user-1", 50).await.expect("init");
            store.try_debit("user-1", 5).await.expect("debit");
        }

        let reopened = FsStore::new(temp_dir.path()).expect("store");
        let balance = reopened
            .ensure_initialized("user-1", 50)
            .await
            .expect("read");
        assert_eq!(balance, 45);
    }

    #[tokio::test]
    async fn test_debit_rejects_insufficient_balance() {
        let temp_dir = TempDir::new().expect("temp dir");
        let store = FsStore::new(temp_dir.path()).expect("store");

        store.ensure_initialized("user-1", 3).await.expect("init");
        let outcome = store.try_debit("user-1", 5).await.expect("debit");
        assert_eq!(outcome, DebitOutcome::Insufficient(3));
    }

    #[tokio::test]
    async fn test_history_appends_and_reads_newest_first() {
        let temp_dir = TempDir::new().expect("temp dir");
        let store = FsStore::new(temp_dir.path()).expect("store");

        for n in 0..3 {
            let entry = HistoryEntry::new(
                "user-1",
                ContentKind::Twitter,
                format!("prompt {n}"),
                &[format!("tweet {n}")],
            );
            store.append(&entry).await.expect("append");
        }

        let entries = store.recent("user-1", Some(2)).await.expect("recent");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].prompt, "prompt 2");
        assert_eq!(entries[1].prompt, "prompt 1");
    }

    #[tokio::test]
    async fn test_history_empty_for_unknown_user() {
        let temp_dir = TempDir::new().expect("temp dir");
        let store = FsStore::new(temp_dir.path()).expect("store");

        let entries = store.recent("nobody", None).await.expect("recent");
        assert!(entries.is_empty());
    }
}
