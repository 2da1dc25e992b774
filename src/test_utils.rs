//! Test utilities and helpers for unit testing
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Document stores that fail or stall on demand
//! - Mock application state

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use sqlx::SqlitePool;
use tokio::sync::Semaphore;

use crate::plans::PlanCatalog;
use crate::progress::backends::MemoryDocumentStore;
use crate::progress::{
  DocumentKey, DocumentStore, ProgressBackend, ProgressDocument, ProgressPatch, StoreError,
};
use crate::state::AppState;
use crate::storage::MemoryStorage;

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases, which would cause intermittent test failures
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

/// The bundled catalog, panicking if the plan data is broken
pub fn test_catalog() -> Arc<PlanCatalog> {
  Arc::new(PlanCatalog::load().expect("Bundled plans should load"))
}

/// App state over in-memory preferences and progress documents
pub fn mock_app_state() -> Arc<AppState> {
  Arc::new(AppState::new(
    Arc::new(MemoryStorage::new()),
    ProgressBackend::Memory(MemoryDocumentStore::new()),
    test_catalog(),
  ))
}

/// ---------------------------------------------------------------------------
/// Document Store Doubles
/// ---------------------------------------------------------------------------

/// Every call fails as if the network were down
#[derive(Debug, Clone, Copy)]
pub struct FailingDocumentStore;

impl DocumentStore for FailingDocumentStore {
  async fn get(&self, _key: &DocumentKey) -> Result<Option<ProgressDocument>, StoreError> {
    Err(StoreError::Unavailable("offline".into()))
  }

  async fn merge(&self, _key: &DocumentKey, _patch: &ProgressPatch) -> Result<(), StoreError> {
    Err(StoreError::Unavailable("offline".into()))
  }
}

/// Memory store whose reads for selected keys wait until the test releases them
#[derive(Debug, Default)]
pub struct GatedDocumentStore {
  inner: MemoryDocumentStore,
  gates: Mutex<HashMap<DocumentKey, Arc<Semaphore>>>,
}

impl GatedDocumentStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn inner(&self) -> &MemoryDocumentStore {
    &self.inner
  }

  /// Hold reads of `key` until a permit is added to the returned semaphore
  pub fn block(&self, key: &DocumentKey) -> Arc<Semaphore> {
    let gate = Arc::new(Semaphore::new(0));
    self
      .gates
      .lock()
      .expect("Gate lock poisoned")
      .insert(key.clone(), Arc::clone(&gate));
    gate
  }

  fn gate(&self, key: &DocumentKey) -> Option<Arc<Semaphore>> {
    self.gates.lock().expect("Gate lock poisoned").get(key).cloned()
  }
}

impl DocumentStore for GatedDocumentStore {
  async fn get(&self, key: &DocumentKey) -> Result<Option<ProgressDocument>, StoreError> {
    if let Some(gate) = self.gate(key) {
      let _permit = gate
        .acquire()
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;
    }
    self.inner.get(key).await
  }

  async fn merge(&self, key: &DocumentKey, patch: &ProgressPatch) -> Result<(), StoreError> {
    self.inner.merge(key, patch).await
  }
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::identity::Identity;
  use crate::plans::PlanId;
  use std::time::Duration;

  fn key() -> DocumentKey {
    DocumentKey::new(&Identity::parse("alice").unwrap(), PlanId::TenK)
  }

  #[tokio::test]
  async fn test_setup_db_creates_schema() {
    let pool = setup_test_db().await;

    let tables: Vec<(String,)> = sqlx::query_as(
      "SELECT name FROM sqlite_master WHERE type='table' AND name = 'progress_documents'",
    )
    .fetch_all(&pool)
    .await
    .expect("Failed to query tables");

    assert_eq!(tables.len(), 1);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_failing_store_fails_both_ways() {
    assert!(FailingDocumentStore.get(&key()).await.is_err());
    assert!(FailingDocumentStore
      .merge(&key(), &ProgressPatch::default())
      .await
      .is_err());
  }

  #[tokio::test]
  async fn test_gated_store_waits_for_permit() {
    let store = Arc::new(GatedDocumentStore::new());
    let gate = store.block(&key());

    let read = {
      let store = Arc::clone(&store);
      tokio::spawn(async move { store.get(&key()).await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!read.is_finished());

    gate.add_permits(1);
    assert_eq!(read.await.unwrap().unwrap(), None);
  }
}
