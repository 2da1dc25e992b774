//! Tauri commands for reading and toggling completion marks

use std::sync::Arc;
use tauri::State;

use crate::plans::WorkoutId;
use crate::progress::{ProgressError, ProgressSnapshot};
use crate::state::AppState;

#[tauri::command]
pub fn get_progress(state: State<'_, Arc<AppState>>) -> ProgressSnapshot {
  state.progress.snapshot()
}

/// Flip the week-level checkmark. The save happens in the background, so
/// this has to run on the async runtime.
#[tauri::command]
pub async fn toggle_week(
  state: State<'_, Arc<AppState>>,
  week: u32,
) -> Result<ProgressSnapshot, ProgressError> {
  state.progress.toggle_week(week)
}

/// Flip a workout checkmark, e.g. `workout_id = "3-1"`
#[tauri::command]
pub async fn toggle_workout(
  state: State<'_, Arc<AppState>>,
  workout_id: String,
) -> Result<ProgressSnapshot, ProgressError> {
  let id: WorkoutId = workout_id
    .parse()
    .map_err(|_| ProgressError::InvalidWorkoutId(workout_id.clone()))?;
  state.progress.toggle_workout(id)
}
