use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::progress::store::{DocumentKey, DocumentStore, ProgressDocument, ProgressPatch, StoreError};

/// Documents held in process memory. Lost on exit.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
  documents: Mutex<HashMap<DocumentKey, ProgressDocument>>,
}

impl MemoryDocumentStore {
  pub fn new() -> Self {
    Self::default()
  }

  #[cfg(test)]
  pub fn len(&self) -> usize {
    self.documents.lock().map(|documents| documents.len()).unwrap_or(0)
  }

  #[cfg(test)]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Direct read without going through the async interface
  pub fn document(&self, key: &DocumentKey) -> Option<ProgressDocument> {
    self.documents.lock().ok()?.get(key).cloned()
  }

  fn lock(
    &self,
  ) -> Result<std::sync::MutexGuard<'_, HashMap<DocumentKey, ProgressDocument>>, StoreError> {
    self
      .documents
      .lock()
      .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
  }
}

impl DocumentStore for MemoryDocumentStore {
  async fn get(&self, key: &DocumentKey) -> Result<Option<ProgressDocument>, StoreError> {
    Ok(self.lock()?.get(key).cloned())
  }

  async fn merge(&self, key: &DocumentKey, patch: &ProgressPatch) -> Result<(), StoreError> {
    let mut documents = self.lock()?;
    let document = documents.entry(key.clone()).or_default();
    patch.apply(document, Utc::now());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::identity::Identity;
  use crate::plans::PlanId;

  fn key() -> DocumentKey {
    DocumentKey::new(&Identity::parse("alice").unwrap(), PlanId::TenK)
  }

  #[tokio::test]
  async fn test_get_missing_returns_none() {
    let store = MemoryDocumentStore::new();
    assert_eq!(store.get(&key()).await.unwrap(), None);
    assert!(store.is_empty());
  }

  #[tokio::test]
  async fn test_merge_creates_then_merges() {
    let store = MemoryDocumentStore::new();
    let first = ProgressPatch {
      completed_weeks: Some(vec![1]),
      completed_workouts: Some(vec!["1-0".into()]),
    };
    store.merge(&key(), &first).await.unwrap();

    let weeks_only = ProgressPatch {
      completed_weeks: Some(vec![1, 2]),
      completed_workouts: None,
    };
    store.merge(&key(), &weeks_only).await.unwrap();

    let document = store.get(&key()).await.unwrap().unwrap();
    assert_eq!(document.completed_weeks, Some(vec![1, 2]));
    assert_eq!(document.completed_workouts, Some(vec!["1-0".to_string()]));
    assert!(document.last_updated.is_some());
    assert_eq!(store.len(), 1);
  }
}
