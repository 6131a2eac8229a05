//! Client-facing session state.
//!
//! Holds the current draft request, in-flight status, last result, and
//! loaded history for presentation. All mutation flows through explicit
//! request/response exchanges with the orchestrator's entry points; there
//! is no ambient global state.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::content::{self, ContentKind};
use crate::history::HistoryEntry;
use crate::orchestrator::{
    GenerationError, GenerationOutcome, GenerationRequest, GenerationResult, Orchestrator,
};
use crate::provider::Attachment;
use crate::storage::StorageError;

/// Presentation state for one signed-in user.
#[derive(Debug, Clone)]
pub struct SessionState {
    user_id: String,
    draft_kind: ContentKind,
    draft_prompt: String,
    draft_attachment: Option<Attachment>,
    in_flight: bool,
    last_result: Option<GenerationResult>,
    last_error: Option<&'static str>,
    balance: Option<u64>,
    history: Vec<HistoryEntry>,
    preview_limit: usize,
    show_all_history: bool,
}

impl SessionState {
    /// Create a fresh session for a user. History previews show
    /// `preview_limit` entries until expanded.
    pub fn new(user_id: impl Into<String>, preview_limit: usize) -> Self {
        Self {
            user_id: user_id.into(),
            draft_kind: ContentKind::Twitter,
            draft_prompt: String::new(),
            draft_attachment: None,
            in_flight: false,
            last_result: None,
            last_error: None,
            balance: None,
            history: Vec::new(),
            preview_limit,
            show_all_history: false,
        }
    }

    /// The session owner's user id.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Set the draft content kind.
    pub fn set_kind(&mut self, kind: ContentKind) {
        self.draft_kind = kind;
    }

    /// Set the draft prompt text.
    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.draft_prompt = prompt.into();
    }

    /// Attach a binary blob to the draft.
    pub fn set_attachment(&mut self, attachment: Attachment) {
        self.draft_attachment = Some(attachment);
    }

    /// Remove the draft attachment.
    pub fn clear_attachment(&mut self) {
        self.draft_attachment = None;
    }

    /// Whether a transaction is currently awaiting the provider.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Last known-committed balance, if loaded.
    pub fn balance(&self) -> Option<u64> {
        self.balance
    }

    /// The most recent result, if any.
    pub fn last_result(&self) -> Option<&GenerationResult> {
        self.last_result.as_ref()
    }

    /// Label of the most recent failure, if any.
    pub fn last_error(&self) -> Option<&'static str> {
        self.last_error
    }

    /// Loaded history, newest first, bounded to the preview limit unless
    /// expanded.
    pub fn visible_history(&self) -> &[HistoryEntry] {
        if self.show_all_history {
            &self.history
        } else {
            let bound = self.preview_limit.min(self.history.len());
            &self.history[..bound]
        }
    }

    /// Toggle between the history preview and the full list.
    pub fn toggle_show_all_history(&mut self) {
        self.show_all_history = !self.show_all_history;
    }

    /// Snapshot the draft as a request and mark the session in flight.
    /// Returns `None` while another request is in flight or the prompt is
    /// still empty.
    pub fn begin(&mut self) -> Option<GenerationRequest> {
        if self.in_flight || self.draft_prompt.trim().is_empty() {
            return None;
        }
        self.in_flight = true;
        self.last_error = None;
        Some(GenerationRequest {
            user_id: self.user_id.clone(),
            kind: self.draft_kind,
            prompt: self.draft_prompt.clone(),
            attachment: self.draft_attachment.clone(),
        })
    }

    /// Apply a completed transaction: result, committed balance, and the new
    /// history entry prepended.
    pub fn apply_outcome(&mut self, outcome: GenerationOutcome) {
        self.in_flight = false;
        self.balance = Some(outcome.balance);
        self.last_result = Some(outcome.result);
        self.history.insert(0, outcome.entry);
    }

    /// Apply a failed transaction. The displayed balance stays at the last
    /// known-committed value.
    pub fn apply_error(&mut self, error: &GenerationError) {
        self.in_flight = false;
        self.last_error = Some(error.kind_label());
    }

    /// Apply a balance read.
    pub fn apply_balance(&mut self, balance: u64) {
        self.balance = Some(balance);
    }

    /// Replace the loaded history.
    pub fn apply_history(&mut self, entries: Vec<HistoryEntry>) {
        self.history = entries;
    }

    /// Load a past generation back into the draft and result view.
    pub fn select_history(&mut self, entry_id: &str) -> bool {
        let Some(entry) = self.history.iter().find(|e| e.id == entry_id) else {
            return false;
        };
        self.draft_kind = entry.kind;
        self.draft_prompt = entry.prompt.clone();
        self.last_result = Some(GenerationResult {
            units: entry.units(),
            raw_text: entry.content.clone(),
        });
        true
    }

    /// Export the last result as `(file name, plain text)`.
    pub fn export_last(&self) -> Option<(String, String)> {
        let result = self.last_result.as_ref()?;
        let name = content::export_file_name(self.draft_kind, Utc::now().date_naive());
        Some((name, result.joined()))
    }
}

/// Shared session wrapper that drives the request/response exchange with
/// the orchestrator.
#[derive(Clone)]
pub struct SharedSessionState {
    inner: Arc<RwLock<SessionState>>,
    orchestrator: Arc<Orchestrator>,
}

impl SharedSessionState {
    /// Create a shared session over an orchestrator.
    pub fn new(orchestrator: Arc<Orchestrator>, state: SessionState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(state)),
            orchestrator,
        }
    }

    /// Run a closure against the current state.
    pub async fn with_state<T>(&self, f: impl FnOnce(&SessionState) -> T) -> T {
        f(&*self.inner.read().await)
    }

    /// Mutate the draft or presentation state.
    pub async fn update<T>(&self, f: impl FnOnce(&mut SessionState) -> T) -> T {
        f(&mut *self.inner.write().await)
    }

    /// Reload balance and history from the orchestrator.
    pub async fn refresh(&self) -> Result<(), StorageError> {
        let user_id = self.inner.read().await.user_id().to_string();
        let balance = self.orchestrator.current_balance(&user_id).await?;
        let history = self.orchestrator.history(&user_id, None).await?;

        let mut state = self.inner.write().await;
        state.apply_balance(balance);
        state.apply_history(history);
        Ok(())
    }

    /// Submit the current draft. The write lock is released while the
    /// provider call is in flight; the `in_flight` flag covers the gap.
    pub async fn generate(&self) -> Result<(), GenerationError> {
        let Some(request) = self.inner.write().await.begin() else {
            return Ok(());
        };

        match self.orchestrator.submit(request).await {
            Ok(outcome) => {
                self.inner.write().await.apply_outcome(outcome);
                Ok(())
            }
            Err(err) => {
                self.inner.write().await.apply_error(&err);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryLog;
    use crate::ledger::CreditLedger;
    use crate::provider::{GenerationProvider, ProviderError};
    use crate::storage::MemoryStore;
    use async_trait::async_trait;

    struct FixedProvider(&'static str);

    #[async_trait]
    impl GenerationProvider for FixedProvider {
        async fn generate(
            &self,
            _instruction: &str,
            _attachment: Option<&Attachment>,
        ) -> Result<String, ProviderError> {
            Ok(self.0.to_string())
        }
    }

    fn shared_session(initial: u64, text: &'static str) -> SharedSessionState {
        let store = Arc::new(MemoryStore::new());
        let orchestrator = Arc::new(Orchestrator::new(
            CreditLedger::new(store.clone(), initial),
            HistoryLog::new(store),
            Arc::new(FixedProvider(text)),
            5,
        ));
        SharedSessionState::new(orchestrator, SessionState::new("user-1", 3))
    }

    #[test]
    fn test_begin_requires_non_empty_prompt() {
        let mut state = SessionState::new("user-1", 3);
        assert!(state.begin().is_none());

        state.set_prompt("rust async");
        let request = state.begin().expect("request");
        assert_eq!(request.prompt, "rust async");
        assert!(state.is_in_flight());

        // No second request while one is in flight.
        assert!(state.begin().is_none());
    }

    #[test]
    fn test_draft_attachment_travels_with_the_request() {
        let mut state = SessionState::new("user-1", 3);
        state.set_kind(ContentKind::Instagram);
        state.set_prompt("coffee");
        state.set_attachment(Attachment::new(vec![1, 2, 3], "image/png"));

        let request = state.begin().expect("request");
        assert_eq!(
            request.attachment.expect("attachment").media_type,
            "image/png"
        );

        state.apply_error(&GenerationError::EmptyPrompt);
        state.clear_attachment();
        let request = state.begin().expect("request");
        assert!(request.attachment.is_none());
    }

    #[test]
    fn test_select_history_restores_draft_and_result() {
        let mut state = SessionState::new("user-1", 3);
        let entry = HistoryEntry::new(
            "user-1",
            ContentKind::Twitter,
            "greetings",
            &["Hi".to_string(), "Bye".to_string()],
        );
        let entry_id = entry.id.clone();
        state.apply_history(vec![entry]);

        assert!(state.select_history(&entry_id));
        assert_eq!(state.last_result().expect("result").units, vec!["Hi", "Bye"]);
        assert!(!state.select_history("missing"));
    }

    #[test]
    fn test_visible_history_respects_preview_limit() {
        let mut state = SessionState::new("user-1", 3);
        let entries: Vec<HistoryEntry> = (0..5)
            .map(|n| {
                HistoryEntry::new(
                    "user-1",
                    ContentKind::Linkedin,
                    format!("prompt {n}"),
                    &[format!("post {n}")],
                )
            })
            .collect();
        state.apply_history(entries);

        assert_eq!(state.visible_history().len(), 3);
        state.toggle_show_all_history();
        assert_eq!(state.visible_history().len(), 5);
    }

    #[test]
    fn test_export_last_joins_units() {
        let mut state = SessionState::new("user-1", 3);
        assert!(state.export_last().is_none());

        state.apply_outcome(GenerationOutcome {
            result: GenerationResult {
                units: vec!["Hi".to_string(), "Bye".to_string()],
                raw_text: "Hi\n\nBye".to_string(),
            },
            balance: 45,
            entry: HistoryEntry::new(
                "user-1",
                ContentKind::Twitter,
                "greetings",
                &["Hi".to_string(), "Bye".to_string()],
            ),
        });

        let (name, text) = state.export_last().expect("export");
        assert!(name.starts_with("twitter-content-"));
        assert!(name.ends_with(".txt"));
        assert_eq!(text, "Hi\n\nBye");
    }

    #[tokio::test]
    async fn test_generate_updates_balance_and_history() {
        let session = shared_session(50, "Hi\n\nBye");
        session.refresh().await.expect("refresh");
        session
            .update(|state| {
                state.set_kind(ContentKind::Twitter);
                state.set_prompt("greetings");
            })
            .await;

        session.generate().await.expect("generate");

        session
            .with_state(|state| {
                assert_eq!(state.balance(), Some(45));
                assert!(!state.is_in_flight());
                assert_eq!(state.visible_history().len(), 1);
                assert_eq!(
                    state.last_result().expect("result").units,
                    vec!["Hi", "Bye"]
                );
            })
            .await;
    }

    #[tokio::test]
    async fn test_failed_generate_keeps_committed_balance() {
        let session = shared_session(3, "text");
        session.refresh().await.expect("refresh");
        session
            .update(|state| state.set_prompt("greetings"))
            .await;

        let err = session.generate().await.unwrap_err();
        assert_eq!(err.kind_label(), "insufficient_credits");

        session
            .with_state(|state| {
                assert_eq!(state.balance(), Some(3));
                assert_eq!(state.last_error(), Some("insufficient_credits"));
                assert!(state.visible_history().is_empty());
            })
            .await;
    }
}
