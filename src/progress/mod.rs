//! Per-user completion tracking
//!
//! `state` holds the completion sets and the numbers derived from them,
//! `store` talks to whichever document backend is configured, and
//! `controller` ties the two together for the active (identity, plan) pair.

pub mod backends;
pub mod controller;
pub mod state;
pub mod store;

pub use backends::ProgressBackend;
pub use controller::{ProgressController, ProgressError, ProgressSnapshot, SessionPhase};
pub use state::CompletionState;
pub use store::{DocumentKey, DocumentStore, ProgressDocument, ProgressPatch, ProgressStore, StoreError};
