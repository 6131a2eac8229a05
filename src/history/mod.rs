//! Append-only generation history.
//!
//! One [`HistoryEntry`] is written per successful generation, immediately
//! after the debit. Entries are immutable once written; the core never
//! updates or deletes them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::{self, ContentKind};
use crate::storage::{DynHistoryStore, StorageResult};

/// Current history record schema version.
pub const HISTORY_SCHEMA_VERSION: u32 = 1;

static ENTRY_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Immutable record of one completed generation attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// History schema version.
    pub schema_version: u32,
    /// Unique entry identifier.
    pub id: String,
    /// Owning user identifier.
    pub user_id: String,
    /// Platform target the content was generated for.
    pub kind: ContentKind,
    /// The user's original prompt text.
    pub prompt: String,
    /// Generated units joined with the documented separator.
    pub content: String,
    /// Timestamp when the entry was recorded.
    pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
    /// Create a new entry with an assigned id and the current timestamp.
    pub fn new(
        user_id: impl Into<String>,
        kind: ContentKind,
        prompt: impl Into<String>,
        units: &[String],
    ) -> Self {
        Self {
            schema_version: HISTORY_SCHEMA_VERSION,
            id: generate_entry_id(),
            user_id: user_id.into(),
            kind,
            prompt: prompt.into(),
            content: content::join_units(units),
            created_at: Utc::now(),
        }
    }

    /// Recover the stored content as display units.
    ///
    /// Thread kinds are re-split on the documented separator; single-block
    /// kinds come back as one unit.
    pub fn units(&self) -> Vec<String> {
        if self.kind.is_threaded() {
            self.content
                .split(content::UNIT_SEPARATOR)
                .map(str::to_string)
                .collect()
        } else {
            vec![self.content.clone()]
        }
    }
}

/// Generate a unique history entry id.
pub fn generate_entry_id() -> String {
    let timestamp_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let sequence = ENTRY_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("gen-{}-{}", timestamp_ms, sequence)
}

/// History log layered over a [`crate::storage::HistoryStore`] backend.
#[derive(Clone)]
pub struct HistoryLog {
    store: DynHistoryStore,
}

impl HistoryLog {
    /// Create a log over the given backend.
    pub fn new(store: DynHistoryStore) -> Self {
        Self { store }
    }

    /// Record a completed generation. Durable once this returns `Ok`.
    pub async fn append(
        &self,
        user_id: &str,
        kind: ContentKind,
        prompt: &str,
        units: &[String],
    ) -> StorageResult<HistoryEntry> {
        let entry = HistoryEntry::new(user_id, kind, prompt, units);
        self.store.append(&entry).await?;
        Ok(entry)
    }

    /// Read a user's entries, newest first, bounded by `limit` when given.
    pub async fn recent(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> StorageResult<Vec<HistoryEntry>> {
        self.store.recent(user_id, limit).await
    }
}
