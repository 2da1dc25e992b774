//! Username entry and persistence
//!
//! The identity is whatever the user typed into the entry form, minus a
//! leading `@`. It is not authenticated and not checked for uniqueness; it
//! only decides whose progress document is read and written.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::storage::{LocalStorage, USER_ID_STORAGE_KEY};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
  #[error("Username must not be empty")]
  Empty,
}

impl Serialize for IdentityError {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(&self.to_string())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
  /// Normalise raw form input: trim, drop one leading `@`, trim again.
  pub fn parse(raw: &str) -> Result<Self, IdentityError> {
    let trimmed = raw.trim();
    let stripped = trimmed.strip_prefix('@').unwrap_or(trimmed).trim();

    if stripped.is_empty() {
      return Err(IdentityError::Empty);
    }

    Ok(Self(stripped.to_string()))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for Identity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// ---------------------------------------------------------------------------
/// Identity Store
/// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct IdentityStore {
  storage: Arc<dyn LocalStorage>,
}

impl IdentityStore {
  pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
    Self { storage }
  }

  /// The persisted identity, or `None` if the user has not entered one yet
  pub fn resolve(&self) -> Option<Identity> {
    let raw = self.storage.get(USER_ID_STORAGE_KEY)?;
    Identity::parse(&raw).ok()
  }

  /// Validate and persist a username. Rejected input leaves storage untouched.
  pub fn set(&self, raw: &str) -> Result<Identity, IdentityError> {
    let identity = Identity::parse(raw)?;
    self.storage.set(USER_ID_STORAGE_KEY, identity.as_str());
    info!(identity = %identity, "Identity set");
    Ok(identity)
  }

  pub fn clear(&self) {
    self.storage.remove(USER_ID_STORAGE_KEY);
    info!("Identity cleared");
  }
}
