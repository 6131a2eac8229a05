//! Postforge: a credit-metered AI social content generation core.
//!
//! An authenticated user spends an integer credit balance to request
//! AI-generated content for a platform target (twitter thread, instagram
//! caption, linkedin post, youtube script) and reviews past generations.
//!
//! # Overview
//!
//! - [`content`]: content kinds plus the pure prompt/output formatter.
//! - [`ledger`]: per-user credit balances with atomic debits.
//! - [`history`]: append-only record of completed generations.
//! - [`provider`]: the external generation provider port and HTTP client.
//! - [`orchestrator`]: the transaction core tying the above together.
//! - [`identity`]: caller credential resolution.
//! - [`session`]: client-facing presentation state.
//! - [`service`]: the axum HTTP boundary.
//! - [`storage`]: persistence ports with memory and filesystem backends.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use postforge::config::ServiceConfig;
//! use postforge::history::HistoryLog;
//! use postforge::ledger::CreditLedger;
//! use postforge::orchestrator::{GenerationRequest, Orchestrator};
//! use postforge::storage::MemoryStore;
//!
//! let config = ServiceConfig::default();
//! let store = Arc::new(MemoryStore::new());
//! let orchestrator = Orchestrator::new(
//!     CreditLedger::new(store.clone(), config.initial_balance),
//!     HistoryLog::new(store),
//!     provider,
//!     config.generation_cost,
//! );
//!
//! let outcome = orchestrator.submit(request).await?;
//! println!("{} units, {} credits left", outcome.result.units.len(), outcome.balance);
//! ```

pub mod config;
pub mod content;
pub mod history;
pub mod identity;
pub mod ledger;
pub mod orchestrator;
pub mod provider;
pub mod service;
pub mod session;
pub mod storage;

pub use config::ServiceConfig;
pub use content::ContentKind;
pub use orchestrator::{
    GenerationError, GenerationOutcome, GenerationRequest, GenerationResult, Orchestrator,
};
