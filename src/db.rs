use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::fs;
use std::path::{Path, PathBuf};
use tauri::Manager;
use tracing::info;

pub type DbPool = SqlitePool;

const DB_FILE_NAME: &str = "running-plan.db";
const PREFS_FILE_NAME: &str = "prefs.json";

/// Get the app data directory, creating it if needed
/// e.g. ~/Library/Application Support/app.running-plan.tracker/
pub fn get_data_dir<R: tauri::Runtime>(
  app: &tauri::AppHandle<R>,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
  let data_dir = app
    .path()
    .app_data_dir()
    .map_err(|e| format!("Failed to get app data dir: {}", e))?;

  fs::create_dir_all(&data_dir)?;

  Ok(data_dir)
}

/// Path of the local preferences file (identity and selected plan)
pub fn prefs_path(data_dir: &Path) -> PathBuf {
  data_dir.join(PREFS_FILE_NAME)
}

/// Open the progress database in `data_dir` and run migrations
pub async fn initialize_db(data_dir: &Path) -> Result<DbPool, Box<dyn std::error::Error>> {
  let db_path = data_dir.join(DB_FILE_NAME);
  let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

  info!(path = %db_path.display(), "Initializing database");

  let pool = SqlitePoolOptions::new()
    .max_connections(5)
    .connect(&db_url)
    .await?;

  sqlx::migrate!("./migrations").run(&pool).await?;

  info!("Database initialized successfully");

  Ok(pool)
}
