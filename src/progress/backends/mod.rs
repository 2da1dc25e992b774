//! Concrete homes for progress documents

pub mod firestore;
pub mod memory;
pub mod sqlite;

pub use firestore::FirestoreDocumentStore;
pub use memory::MemoryDocumentStore;
pub use sqlite::SqliteDocumentStore;

use super::store::{DocumentKey, DocumentStore, ProgressDocument, ProgressPatch, StoreError};

/// The backend chosen at startup
#[derive(Debug)]
pub enum ProgressBackend {
  Sqlite(SqliteDocumentStore),
  Firestore(FirestoreDocumentStore),
  Memory(MemoryDocumentStore),
}

impl ProgressBackend {
  pub fn name(&self) -> &'static str {
    match self {
      Self::Sqlite(_) => "sqlite",
      Self::Firestore(_) => "firestore",
      Self::Memory(_) => "memory",
    }
  }
}

impl DocumentStore for ProgressBackend {
  async fn get(&self, key: &DocumentKey) -> Result<Option<ProgressDocument>, StoreError> {
    match self {
      Self::Sqlite(store) => store.get(key).await,
      Self::Firestore(store) => store.get(key).await,
      Self::Memory(store) => store.get(key).await,
    }
  }

  async fn merge(&self, key: &DocumentKey, patch: &ProgressPatch) -> Result<(), StoreError> {
    match self {
      Self::Sqlite(store) => store.merge(key, patch).await,
      Self::Firestore(store) => store.merge(key, patch).await,
      Self::Memory(store) => store.merge(key, patch).await,
    }
  }
}
