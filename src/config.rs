//! Runtime configuration from environment variables (and `.env`)

use std::env;
use thiserror::Error;

/// ---------------------------------------------------------------------------
/// Configuration Constants
/// ---------------------------------------------------------------------------

const DEFAULT_FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";
const DEFAULT_FIRESTORE_DATABASE: &str = "(default)";
const DEFAULT_FIRESTORE_COLLECTION: &str = "running_progress";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
  #[error("Missing configuration: {0}")]
  MissingConfig(String),

  #[error("Invalid configuration for {name}: {reason}")]
  Invalid { name: String, reason: String },
}

fn optional_var(name: &str) -> Option<String> {
  env::var(name)
    .ok()
    .map(|value| value.trim().to_string())
    .filter(|value| !value.is_empty())
}

fn required_var(name: &str) -> Result<String, ConfigError> {
  optional_var(name).ok_or_else(|| ConfigError::MissingConfig(name.into()))
}

/// ---------------------------------------------------------------------------
/// Firestore
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirestoreConfig {
  pub project_id: String,
  pub api_key: String,
  pub database: String,
  pub collection: String,
  pub base_url: String,
}

impl FirestoreConfig {
  pub fn from_env() -> Result<Self, ConfigError> {
    let base_url =
      optional_var("FIRESTORE_BASE_URL").unwrap_or_else(|| DEFAULT_FIRESTORE_BASE_URL.into());

    url::Url::parse(&base_url).map_err(|e| ConfigError::Invalid {
      name: "FIRESTORE_BASE_URL".into(),
      reason: e.to_string(),
    })?;

    Ok(Self {
      project_id: required_var("FIRESTORE_PROJECT_ID")?,
      api_key: required_var("FIRESTORE_API_KEY")?,
      database: optional_var("FIRESTORE_DATABASE")
        .unwrap_or_else(|| DEFAULT_FIRESTORE_DATABASE.into()),
      collection: optional_var("FIRESTORE_COLLECTION")
        .unwrap_or_else(|| DEFAULT_FIRESTORE_COLLECTION.into()),
      base_url,
    })
  }
}

/// ---------------------------------------------------------------------------
/// Application Config
/// ---------------------------------------------------------------------------

/// Where progress documents are kept
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressStoreConfig {
  /// `running-plan.db` in the app data dir
  Sqlite,
  Firestore(FirestoreConfig),
  /// Nothing survives a restart
  Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
  pub progress_store: ProgressStoreConfig,
}

impl AppConfig {
  pub fn from_env() -> Result<Self, ConfigError> {
    let backend = optional_var("PROGRESS_STORE").unwrap_or_else(|| "sqlite".into());

    let progress_store = match backend.to_ascii_lowercase().as_str() {
      "sqlite" => ProgressStoreConfig::Sqlite,
      "firestore" => ProgressStoreConfig::Firestore(FirestoreConfig::from_env()?),
      "memory" => ProgressStoreConfig::Memory,
      other => {
        return Err(ConfigError::Invalid {
          name: "PROGRESS_STORE".into(),
          reason: format!("unknown backend '{}'", other),
        })
      }
    };

    Ok(Self { progress_store })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  const FIRESTORE_VARS: [&str; 5] = [
    "FIRESTORE_PROJECT_ID",
    "FIRESTORE_API_KEY",
    "FIRESTORE_DATABASE",
    "FIRESTORE_COLLECTION",
    "FIRESTORE_BASE_URL",
  ];

  fn cleared() -> Vec<(&'static str, Option<&'static str>)> {
    FIRESTORE_VARS.iter().map(|name| (*name, None)).collect()
  }

  #[test]
  #[serial]
  fn test_defaults_to_sqlite() {
    temp_env::with_var_unset("PROGRESS_STORE", || {
      let config = AppConfig::from_env().unwrap();
      assert_eq!(config.progress_store, ProgressStoreConfig::Sqlite);
    });
  }

  #[test]
  #[serial]
  fn test_memory_backend() {
    temp_env::with_var("PROGRESS_STORE", Some("Memory"), || {
      let config = AppConfig::from_env().unwrap();
      assert_eq!(config.progress_store, ProgressStoreConfig::Memory);
    });
  }

  #[test]
  #[serial]
  fn test_unknown_backend_is_rejected() {
    temp_env::with_var("PROGRESS_STORE", Some("postgres"), || {
      let err = AppConfig::from_env().unwrap_err();
      assert!(matches!(err, ConfigError::Invalid { ref name, .. } if name == "PROGRESS_STORE"));
    });
  }

  #[test]
  #[serial]
  fn test_firestore_requires_project_and_key() {
    let mut vars = cleared();
    vars.push(("PROGRESS_STORE", Some("firestore")));
    vars.push(("FIRESTORE_API_KEY", Some("abc")));

    temp_env::with_vars(vars, || {
      assert_eq!(
        AppConfig::from_env().unwrap_err(),
        ConfigError::MissingConfig("FIRESTORE_PROJECT_ID".into())
      );
    });
  }

  #[test]
  #[serial]
  fn test_firestore_defaults() {
    let mut vars = cleared();
    vars.push(("PROGRESS_STORE", Some("firestore")));
    vars.push(("FIRESTORE_PROJECT_ID", Some("corrida")));
    vars.push(("FIRESTORE_API_KEY", Some("abc")));

    temp_env::with_vars(vars, || {
      let config = AppConfig::from_env().unwrap();
      let ProgressStoreConfig::Firestore(firestore) = config.progress_store else {
        panic!("Expected firestore backend");
      };
      assert_eq!(firestore.project_id, "corrida");
      assert_eq!(firestore.database, "(default)");
      assert_eq!(firestore.collection, "running_progress");
      assert_eq!(firestore.base_url, "https://firestore.googleapis.com/v1");
    });
  }

  #[test]
  #[serial]
  fn test_firestore_rejects_bad_base_url() {
    let mut vars = cleared();
    vars.push(("FIRESTORE_PROJECT_ID", Some("corrida")));
    vars.push(("FIRESTORE_API_KEY", Some("abc")));
    vars.push(("FIRESTORE_BASE_URL", Some("not a url")));

    temp_env::with_vars(vars, || {
      assert!(matches!(
        FirestoreConfig::from_env(),
        Err(ConfigError::Invalid { .. })
      ));
    });
  }
}
