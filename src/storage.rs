//! Local key-value preferences
//!
//! Small string-to-string store for values that never leave the machine:
//! the chosen username and the selected plan. Reads and writes are
//! synchronous. A store that cannot be read behaves as if nothing was ever
//! saved, and failed writes are logged and dropped.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tempfile::NamedTempFile;
use tracing::warn;

/// Key holding the persisted username
pub const USER_ID_STORAGE_KEY: &str = "running_plan_user_id_v1";

/// Key holding the persisted plan id
pub const SELECTED_PLAN_STORAGE_KEY: &str = "running_plan_selected_plan_v1";

pub trait LocalStorage: Send + Sync {
  fn get(&self, key: &str) -> Option<String>;
  fn set(&self, key: &str, value: &str);
  fn remove(&self, key: &str);
}

/// ---------------------------------------------------------------------------
/// In-memory storage
/// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryStorage {
  values: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }
}

impl LocalStorage for MemoryStorage {
  fn get(&self, key: &str) -> Option<String> {
    let values = self.values.lock().ok()?;
    values.get(key).cloned()
  }

  fn set(&self, key: &str, value: &str) {
    if let Ok(mut values) = self.values.lock() {
      values.insert(key.to_string(), value.to_string());
    }
  }

  fn remove(&self, key: &str) {
    if let Ok(mut values) = self.values.lock() {
      values.remove(key);
    }
  }
}

/// ---------------------------------------------------------------------------
/// JSON file storage
/// ---------------------------------------------------------------------------

/// Preferences kept as one flat JSON object on disk.
///
/// The whole file is read on every `get` and rewritten on every mutation.
/// The file holds two short strings, so there is nothing worth caching.
/// Rewrites go to a sibling temp file that is renamed over the original, so
/// a reader never sees a truncated file.
#[derive(Debug)]
pub struct JsonFileStorage {
  path: PathBuf,
  io_lock: Mutex<()>,
}

impl JsonFileStorage {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      io_lock: Mutex::new(()),
    }
  }

  fn lock(&self) -> MutexGuard<'_, ()> {
    match self.io_lock.lock() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    }
  }

  fn read_all(&self) -> BTreeMap<String, String> {
    let contents = match fs::read_to_string(&self.path) {
      Ok(contents) => contents,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
      Err(e) => {
        warn!(path = %self.path.display(), error = %e, "Failed to read preferences");
        return BTreeMap::new();
      }
    };

    serde_json::from_str(&contents).unwrap_or_else(|e| {
      warn!(path = %self.path.display(), error = %e, "Ignoring malformed preferences file");
      BTreeMap::new()
    })
  }

  fn write_all(&self, values: &BTreeMap<String, String>) {
    if let Err(e) = self.replace_file(values) {
      warn!(path = %self.path.display(), error = %e, "Failed to write preferences");
    }
  }

  fn replace_file(&self, values: &BTreeMap<String, String>) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(values)?;
    let dir = match self.path.parent() {
      Some(parent) if !parent.as_os_str().is_empty() => parent,
      _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(json.as_bytes())?;
    file.as_file().sync_all()?;
    file.persist(&self.path)?;
    Ok(())
  }

  fn update(&self, apply: impl FnOnce(&mut BTreeMap<String, String>)) {
    // Serialise read-modify-write cycles from concurrent commands
    let _guard = self.lock();
    let mut values = self.read_all();
    apply(&mut values);
    self.write_all(&values);
  }
}

impl LocalStorage for JsonFileStorage {
  fn get(&self, key: &str) -> Option<String> {
    let _guard = self.lock();
    self.read_all().remove(key)
  }

  fn set(&self, key: &str, value: &str) {
    self.update(|values| {
      values.insert(key.to_string(), value.to_string());
    });
  }

  fn remove(&self, key: &str) {
    self.update(|values| {
      values.remove(key);
    });
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Arc;
  use std::thread;

  #[test]
  fn test_memory_storage_set_get_remove() {
    let storage = MemoryStorage::new();
    assert_eq!(storage.get("k"), None);

    storage.set("k", "v");
    assert_eq!(storage.get("k").as_deref(), Some("v"));

    storage.remove("k");
    assert_eq!(storage.get("k"), None);
  }

  #[test]
  fn test_json_file_storage_persists_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefs.json");

    let storage = JsonFileStorage::new(&path);
    storage.set(USER_ID_STORAGE_KEY, "alice");
    storage.set(SELECTED_PLAN_STORAGE_KEY, "5k-sub-25");

    let reopened = JsonFileStorage::new(&path);
    assert_eq!(reopened.get(USER_ID_STORAGE_KEY).as_deref(), Some("alice"));
    assert_eq!(reopened.get(SELECTED_PLAN_STORAGE_KEY).as_deref(), Some("5k-sub-25"));

    reopened.remove(USER_ID_STORAGE_KEY);
    assert_eq!(storage.get(USER_ID_STORAGE_KEY), None);
    assert_eq!(storage.get(SELECTED_PLAN_STORAGE_KEY).as_deref(), Some("5k-sub-25"));
  }

  #[test]
  fn test_json_file_storage_missing_file_reads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let storage = JsonFileStorage::new(dir.path().join("nested").join("prefs.json"));

    assert_eq!(storage.get(USER_ID_STORAGE_KEY), None);

    // Parent directories are created on first write
    storage.set(USER_ID_STORAGE_KEY, "bob");
    assert_eq!(storage.get(USER_ID_STORAGE_KEY).as_deref(), Some("bob"));
  }

  #[test]
  fn test_json_file_storage_reads_survive_concurrent_writes() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(JsonFileStorage::new(dir.path().join("prefs.json")));
    storage.set(USER_ID_STORAGE_KEY, "alice");

    let writer = {
      let storage = Arc::clone(&storage);
      thread::spawn(move || {
        for i in 0..500 {
          let plan = if i % 2 == 0 { "10k" } else { "5k-sub-25" };
          storage.set(SELECTED_PLAN_STORAGE_KEY, plan);
        }
      })
    };

    let misses = (0..2000)
      .filter(|_| storage.get(USER_ID_STORAGE_KEY).as_deref() != Some("alice"))
      .count();
    writer.join().unwrap();

    assert_eq!(misses, 0);
    let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(leftovers.len(), 1, "Temp files should be renamed into place");
  }

  #[test]
  fn test_json_file_storage_malformed_file_reads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefs.json");
    fs::write(&path, "{not json").unwrap();

    let storage = JsonFileStorage::new(&path);
    assert_eq!(storage.get(USER_ID_STORAGE_KEY), None);

    storage.set(USER_ID_STORAGE_KEY, "carol");
    assert_eq!(storage.get(USER_ID_STORAGE_KEY).as_deref(), Some("carol"));
  }
}
