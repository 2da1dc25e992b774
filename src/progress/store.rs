//! Progress documents and the best-effort store in front of them
//!
//! One document per (identity, plan) pair holds the completed week numbers,
//! the completed workout ids and a server-assigned update time. Backends only
//! need last-write-wins per key; writes merge into the existing document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use super::CompletionState;
use crate::identity::Identity;
use crate::plans::{PlanId, WorkoutId};

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("HTTP request failed: {0}")]
  Request(#[from] reqwest::Error),

  #[error("API error ({status}): {message}")]
  Api { status: u16, message: String },

  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Malformed document: {0}")]
  Malformed(String),

  #[error("Store unavailable: {0}")]
  Unavailable(String),
}

/// ---------------------------------------------------------------------------
/// Documents
/// ---------------------------------------------------------------------------

/// Address of one progress document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentKey(String);

impl DocumentKey {
  /// `{form-urlencoded identity}__{plan id}`
  pub fn new(identity: &Identity, plan_id: PlanId) -> Self {
    let encoded: String = url::form_urlencoded::byte_serialize(identity.as_str().as_bytes()).collect();
    Self(format!("{}__{}", encoded, plan_id))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for DocumentKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressDocument {
  pub completed_weeks: Option<Vec<u32>>,
  pub completed_workouts: Option<Vec<String>>,
  pub last_updated: Option<DateTime<Utc>>,
}

/// Fields to merge into a document. `None` leaves the stored field alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPatch {
  pub completed_weeks: Option<Vec<u32>>,
  pub completed_workouts: Option<Vec<String>>,
}

impl ProgressPatch {
  /// Full snapshot of both sets
  pub fn from_state(state: &CompletionState) -> Self {
    Self {
      completed_weeks: Some(state.completed_weeks.iter().copied().collect()),
      completed_workouts: Some(state.completed_workouts.iter().map(ToString::to_string).collect()),
    }
  }

  /// Apply this patch to an existing document, stamping `now`
  pub fn apply(&self, document: &mut ProgressDocument, now: DateTime<Utc>) {
    if let Some(weeks) = &self.completed_weeks {
      document.completed_weeks = Some(weeks.clone());
    }
    if let Some(workouts) = &self.completed_workouts {
      document.completed_workouts = Some(workouts.clone());
    }
    document.last_updated = Some(now);
  }
}

impl ProgressDocument {
  /// Convert to in-memory state. Workout ids that do not parse are dropped.
  pub fn into_state(self, key: &DocumentKey) -> CompletionState {
    let completed_weeks = self.completed_weeks.unwrap_or_default().into_iter().collect();
    let completed_workouts = self
      .completed_workouts
      .unwrap_or_default()
      .into_iter()
      .filter_map(|raw| match raw.parse::<WorkoutId>() {
        Ok(id) => Some(id),
        Err(e) => {
          warn!(key = %key, error = %e, "Dropping unrecognised workout id");
          None
        }
      })
      .collect();

    CompletionState {
      completed_weeks,
      completed_workouts,
    }
  }
}

/// ---------------------------------------------------------------------------
/// Document Store
/// ---------------------------------------------------------------------------

/// Narrow get/merge interface over whatever holds the progress documents
pub trait DocumentStore: Send + Sync + 'static {
  fn get(
    &self,
    key: &DocumentKey,
  ) -> impl Future<Output = Result<Option<ProgressDocument>, StoreError>> + Send;

  fn merge(
    &self,
    key: &DocumentKey,
    patch: &ProgressPatch,
  ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// ---------------------------------------------------------------------------
/// Progress Store
/// ---------------------------------------------------------------------------

/// Wraps a `DocumentStore` and swallows every failure.
///
/// Loads that fail look exactly like "no progress yet". Saves that fail are
/// dropped; the next successful save carries the full sets again.
pub struct ProgressStore<S> {
  documents: Arc<S>,
}

impl<S> Clone for ProgressStore<S> {
  fn clone(&self) -> Self {
    Self {
      documents: Arc::clone(&self.documents),
    }
  }
}

impl<S: DocumentStore> ProgressStore<S> {
  pub fn new(documents: S) -> Self {
    Self {
      documents: Arc::new(documents),
    }
  }

  pub fn documents(&self) -> &S {
    &self.documents
  }

  pub async fn load(&self, identity: &Identity, plan_id: PlanId) -> CompletionState {
    self.load_key(&DocumentKey::new(identity, plan_id)).await
  }

  pub async fn save(&self, identity: &Identity, plan_id: PlanId, state: &CompletionState) {
    self.save_key(&DocumentKey::new(identity, plan_id), state).await
  }

  async fn load_key(&self, key: &DocumentKey) -> CompletionState {
    match self.documents.get(key).await {
      Ok(Some(document)) => {
        debug!(key = %key, "Loaded progress document");
        document.into_state(key)
      }
      Ok(None) => {
        debug!(key = %key, "No progress document yet");
        CompletionState::default()
      }
      Err(e) => {
        warn!(key = %key, error = %e, "Failed to load progress, starting empty");
        CompletionState::default()
      }
    }
  }

  async fn save_key(&self, key: &DocumentKey, state: &CompletionState) {
    let patch = ProgressPatch::from_state(state);
    match self.documents.merge(key, &patch).await {
      Ok(()) => debug!(
        key = %key,
        weeks = state.completed_weeks.len(),
        workouts = state.completed_workouts.len(),
        "Saved progress"
      ),
      Err(e) => warn!(key = %key, error = %e, "Failed to save progress, dropping write"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::progress::backends::MemoryDocumentStore;
  use crate::test_utils::FailingDocumentStore;

  fn alice() -> Identity {
    Identity::parse("alice").unwrap()
  }

  #[test]
  fn test_document_key_is_deterministic_per_pair() {
    let key = DocumentKey::new(&alice(), PlanId::TenK);
    assert_eq!(key.as_str(), "alice__10k");
    assert_eq!(key, DocumentKey::new(&alice(), PlanId::TenK));
    assert_ne!(key, DocumentKey::new(&alice(), PlanId::FiveKSub25));
  }

  #[test]
  fn test_document_key_escapes_identity() {
    let identity = Identity::parse("a/b c").unwrap();
    let key = DocumentKey::new(&identity, PlanId::FiveKSub25);
    assert_eq!(key.as_str(), "a%2Fb+c__5k-sub-25");
  }

  #[test]
  fn test_patch_apply_leaves_missing_fields_untouched() {
    let mut document = ProgressDocument {
      completed_weeks: Some(vec![1, 2]),
      completed_workouts: Some(vec!["1-0".into()]),
      last_updated: None,
    };
    let patch = ProgressPatch {
      completed_weeks: None,
      completed_workouts: Some(vec!["2-1".into()]),
    };

    let now = Utc::now();
    patch.apply(&mut document, now);
    assert_eq!(document.completed_weeks, Some(vec![1, 2]));
    assert_eq!(document.completed_workouts, Some(vec!["2-1".to_string()]));
    assert_eq!(document.last_updated, Some(now));
  }

  #[test]
  fn test_into_state_drops_malformed_workout_ids() {
    let document = ProgressDocument {
      completed_weeks: Some(vec![3]),
      completed_workouts: Some(vec!["1-0".into(), "garbage".into(), "4-2".into()]),
      last_updated: None,
    };
    let state = document.into_state(&DocumentKey::new(&alice(), PlanId::TenK));

    assert!(state.is_week_complete(3));
    assert_eq!(state.completed_workouts.len(), 2);
    assert!(state.is_workout_complete(WorkoutId::new(4, 2)));
  }

  #[tokio::test]
  async fn test_load_missing_document_is_empty() {
    let store = ProgressStore::new(MemoryDocumentStore::new());
    let state = store.load(&alice(), PlanId::TenK).await;
    assert!(state.is_empty());
  }

  #[tokio::test]
  async fn test_save_then_load_round_trips_sets() {
    let store = ProgressStore::new(MemoryDocumentStore::new());
    let mut state = CompletionState::default();
    state.toggle_week(5);
    state.toggle_week(1);
    state.toggle_workout(WorkoutId::new(3, 1));
    state.toggle_workout(WorkoutId::new(1, 0));

    store.save(&alice(), PlanId::TenK, &state).await;
    let reloaded = store.load(&alice(), PlanId::TenK).await;
    assert_eq!(reloaded, state);

    let other_plan = store.load(&alice(), PlanId::FiveKSub25).await;
    assert!(other_plan.is_empty());
  }

  #[tokio::test]
  async fn test_failures_are_swallowed() {
    let store = ProgressStore::new(FailingDocumentStore);
    let mut state = CompletionState::default();
    state.toggle_week(2);

    // Neither call surfaces the failure
    store.save(&alice(), PlanId::TenK, &state).await;
    let loaded = store.load(&alice(), PlanId::TenK).await;
    assert!(loaded.is_empty());
  }
}
