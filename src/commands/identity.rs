//! Tauri commands for the username entry form

use std::sync::Arc;
use tauri::State;
use tracing::info;

use crate::identity::{Identity, IdentityError};
use crate::progress::ProgressSnapshot;
use crate::state::AppState;

/// The stored username, if the user has entered one
#[tauri::command]
pub fn get_identity(state: State<'_, Arc<AppState>>) -> Option<Identity> {
  state.identity.resolve()
}

/// Submit the entry form. Blank input is rejected and nothing is stored.
#[tauri::command]
pub async fn set_identity(
  state: State<'_, Arc<AppState>>,
  username: String,
) -> Result<ProgressSnapshot, IdentityError> {
  let snapshot = state.sign_in(&username).await?;
  info!(identity = ?snapshot.identity, "Username accepted");
  Ok(snapshot)
}

/// "Change user"
#[tauri::command]
pub fn clear_identity(state: State<'_, Arc<AppState>>) -> ProgressSnapshot {
  info!("Clearing username");
  state.sign_out()
}
