//! Generation transaction orchestration.
//!
//! One [`Orchestrator::submit`] call runs a single transaction:
//! validate (prompt non-empty, balance covers the cost), build the provider
//! instruction, await the provider, normalize the output, debit the ledger,
//! append a history entry. The provider call is the only suspension point;
//! every mutation happens strictly after it resolves, so an abandoned call
//! never charges credits or writes history.
//!
//! A user is charged if and only if a history entry for the attempt was
//! durably recorded, with one acknowledged exception: if the history append
//! fails after the debit succeeded, the attempt stays charged and the event
//! is logged at error level for operator reconciliation.

use thiserror::Error;
use tracing::{error, info, warn};

use crate::content::{self, ContentKind, FormatError};
use crate::history::{HistoryEntry, HistoryLog};
use crate::ledger::{CreditLedger, LedgerError};
use crate::provider::{Attachment, DynGenerationProvider, ProviderError};
use crate::storage::StorageError;

/// One generation request. Lives only for the duration of a transaction.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Stable user identifier, as supplied by the identity provider.
    pub user_id: String,
    /// Platform target.
    pub kind: ContentKind,
    /// Non-empty prompt text.
    pub prompt: String,
    /// Optional binary attachment forwarded to the provider.
    pub attachment: Option<Attachment>,
}

/// Normalized provider output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    /// Ordered units: one per thread segment, or a single block.
    pub units: Vec<String>,
    /// Raw provider text before normalization.
    pub raw_text: String,
}

impl GenerationResult {
    /// Units joined with the documented separator, as persisted in history.
    pub fn joined(&self) -> String {
        content::join_units(&self.units)
    }
}

/// Successful transaction output.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    /// The normalized generation result.
    pub result: GenerationResult,
    /// Balance after the debit.
    pub balance: u64,
    /// The history entry recorded for this attempt.
    pub entry: HistoryEntry,
}

/// Tagged failure taxonomy for a generation transaction.
#[derive(Error, Debug)]
pub enum GenerationError {
    /// Prompt was empty; rejected before any external call.
    #[error("prompt must not be empty")]
    EmptyPrompt,

    /// Balance below the generation cost. Recoverable by topping up.
    #[error("insufficient credits: balance {balance}, cost {cost}")]
    InsufficientCredits {
        /// The caller's unchanged balance.
        balance: u64,
        /// The fixed generation cost.
        cost: u64,
    },

    /// Provider call failed. Recoverable: no credits lost, retry is the
    /// caller's decision.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Provider output yielded no usable unit. Recoverable: no credits lost.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Storage failure; fatal to the transaction.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl GenerationError {
    /// Stable label for logs and wire responses.
    pub fn kind_label(&self) -> &'static str {
        match self {
            GenerationError::EmptyPrompt => "invalid_request",
            GenerationError::InsufficientCredits { .. } => "insufficient_credits",
            GenerationError::Provider(_) => "provider_error",
            GenerationError::Format(_) => "format_error",
            GenerationError::Storage(_) => "storage_error",
        }
    }

    /// Whether the caller can recover by retrying or correcting the request.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, GenerationError::Storage(_))
    }
}

/// Composes formatter, ledger, history, and the generation provider into
/// one request/response transaction. The sole caller of ledger mutation and
/// history appends.
#[derive(Clone)]
pub struct Orchestrator {
    ledger: CreditLedger,
    history: HistoryLog,
    provider: DynGenerationProvider,
    cost: u64,
}

impl Orchestrator {
    /// Create an orchestrator charging `cost` credits per generation.
    pub fn new(
        ledger: CreditLedger,
        history: HistoryLog,
        provider: DynGenerationProvider,
        cost: u64,
    ) -> Self {
        Self {
            ledger,
            history,
            provider,
            cost,
        }
    }

    /// The fixed per-generation cost in credits.
    pub fn cost(&self) -> u64 {
        self.cost
    }

    /// Run one generation transaction.
    pub async fn submit(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationOutcome, GenerationError> {
        // Validating: reject before any external call.
        if request.prompt.trim().is_empty() {
            return Err(GenerationError::EmptyPrompt);
        }

        let balance = self.ledger.balance(&request.user_id).await?;
        if balance < self.cost {
            info!(
                user_id = %request.user_id,
                balance,
                cost = self.cost,
                "generation rejected: insufficient credits"
            );
            return Err(GenerationError::InsufficientCredits {
                balance,
                cost: self.cost,
            });
        }

        // AwaitingProvider: the sole suspension point. Nothing has been
        // mutated yet, so dropping this future leaves balance and history
        // untouched.
        let instruction = content::build_prompt(
            request.kind,
            &request.prompt,
            request.attachment.is_some(),
        );
        let raw_text = self
            .provider
            .generate(&instruction, request.attachment.as_ref())
            .await?;

        // Settling: normalize before any debit. A format failure must never
        // deduct credits.
        let units = match content::parse_output(request.kind, &raw_text) {
            Ok(units) => units,
            Err(err) => {
                warn!(
                    user_id = %request.user_id,
                    kind = %request.kind,
                    raw_len = raw_text.len(),
                    "provider output unusable; no credits charged"
                );
                return Err(err.into());
            }
        };

        let new_balance = match self.ledger.try_debit(&request.user_id, self.cost).await {
            Ok(balance) => balance,
            Err(LedgerError::InsufficientCredits { balance, requested }) => {
                // Balance changed concurrently since validation. No content
                // is handed out free.
                info!(
                    user_id = %request.user_id,
                    balance,
                    cost = requested,
                    "balance spent concurrently; generation not settled"
                );
                return Err(GenerationError::InsufficientCredits {
                    balance,
                    cost: requested,
                });
            }
            Err(LedgerError::Storage(err)) => return Err(err.into()),
        };

        let entry = match self
            .history
            .append(&request.user_id, request.kind, &request.prompt, &units)
            .await
        {
            Ok(entry) => entry,
            Err(err) => {
                // The debit already applied. Accepted inconsistency window:
                // charged but unrecorded, surfaced for reconciliation.
                error!(
                    user_id = %request.user_id,
                    cost = self.cost,
                    error = %err,
                    "history append failed after debit; attempt charged but unrecorded"
                );
                return Err(err.into());
            }
        };

        info!(
            user_id = %request.user_id,
            kind = %request.kind,
            units = units.len(),
            balance = new_balance,
            entry_id = %entry.id,
            "generation completed"
        );

        Ok(GenerationOutcome {
            result: GenerationResult {
                units,
                raw_text,
            },
            balance: new_balance,
            entry,
        })
    }

    /// Read the caller's balance, initializing first-seen users.
    pub async fn current_balance(&self, user_id: &str) -> Result<u64, StorageError> {
        self.ledger.balance(user_id).await
    }

    /// Read the caller's history, newest first.
    pub async fn history(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<HistoryEntry>, StorageError> {
        self.history.recent(user_id, limit).await
    }

    /// Unconditionally top up the caller's balance.
    pub async fn credit(&self, user_id: &str, amount: u64) -> Result<u64, StorageError> {
        self.ledger.credit(user_id, amount).await
    }
}
