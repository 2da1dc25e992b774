mod commands;
mod config;
mod db;
mod identity;
mod logging;
mod plans;
mod progress;
mod state;
mod storage;

#[cfg(test)]
mod test_utils;

use config::{AppConfig, ProgressStoreConfig};
use logging::LoggingConfig;
use plans::PlanCatalog;
use progress::backends::{FirestoreDocumentStore, MemoryDocumentStore, SqliteDocumentStore};
use progress::ProgressBackend;
use state::AppState;
use std::path::Path;
use std::sync::Arc;
use storage::JsonFileStorage;
use tauri::{Emitter, Manager, RunEvent};
use tracing::{error, info, warn};

const PROGRESS_EVENT: &str = "progress-changed";

/// Open whichever document store the config names
async fn build_backend(
  config: &AppConfig,
  data_dir: &Path,
) -> Result<ProgressBackend, Box<dyn std::error::Error>> {
  let backend = match &config.progress_store {
    ProgressStoreConfig::Sqlite => {
      ProgressBackend::Sqlite(SqliteDocumentStore::new(db::initialize_db(data_dir).await?))
    }
    ProgressStoreConfig::Firestore(firestore) => {
      ProgressBackend::Firestore(FirestoreDocumentStore::new(firestore.clone()))
    }
    ProgressStoreConfig::Memory => {
      warn!("Using in-memory progress store, nothing will survive a restart");
      ProgressBackend::Memory(MemoryDocumentStore::new())
    }
  };

  info!(backend = backend.name(), "Progress store ready");
  Ok(backend)
}

/// Push every snapshot to the webview
fn forward_snapshots<R: tauri::Runtime>(app: tauri::AppHandle<R>, state: &AppState) {
  let mut snapshots = state.progress.subscribe();

  tauri::async_runtime::spawn(async move {
    while snapshots.changed().await.is_ok() {
      let snapshot = snapshots.borrow_and_update().clone();
      if let Err(e) = app.emit(PROGRESS_EVENT, snapshot) {
        warn!(error = %e, "Failed to emit progress snapshot");
      }
    }
  });
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
  // Load environment variables from .env file
  dotenvy::dotenv().ok();
  logging::init_logging(&LoggingConfig::from_env());

  let app = tauri::Builder::default()
    .setup(|app| {
      let app_handle = app.handle().clone();
      let data_dir = db::get_data_dir(&app_handle)?;
      let config = AppConfig::from_env()?;
      let catalog = Arc::new(PlanCatalog::load()?);
      let storage = Arc::new(JsonFileStorage::new(db::prefs_path(&data_dir)));

      let backend = tauri::async_runtime::block_on(build_backend(&config, &data_dir))?;
      let state = Arc::new(AppState::new(storage, backend, catalog));
      app_handle.manage(Arc::clone(&state));

      forward_snapshots(app_handle, &state);
      tauri::async_runtime::spawn(async move {
        state.resume().await;
      });

      Ok(())
    })
    .invoke_handler(tauri::generate_handler![
      // Identity commands
      commands::identity::get_identity,
      commands::identity::set_identity,
      commands::identity::clear_identity,
      // Plan commands
      commands::plans::list_plans,
      commands::plans::get_plan,
      commands::plans::get_selected_plan,
      commands::plans::select_plan,
      // Progress commands
      commands::progress::get_progress,
      commands::progress::toggle_week,
      commands::progress::toggle_workout,
    ])
    .build(tauri::generate_context!());

  let app = match app {
    Ok(app) => app,
    Err(e) => {
      error!(error = %e, "Failed to start application");
      return;
    }
  };

  app.run(|app_handle, event| {
    if let RunEvent::Exit = event {
      if let Some(state) = app_handle.try_state::<Arc<AppState>>() {
        info!("Flushing pending progress saves");
        tauri::async_runtime::block_on(state.progress.flush());
      }
    }
  });
}
