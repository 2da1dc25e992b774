//! Tauri commands for browsing and switching plans

use std::sync::Arc;
use tauri::State;

use crate::plans::{PlanDefinition, PlanError, PlanId, PlanSummary};
use crate::progress::ProgressSnapshot;
use crate::state::AppState;

#[tauri::command]
pub fn list_plans(state: State<'_, Arc<AppState>>) -> Vec<PlanSummary> {
  state.catalog.summaries()
}

/// Full plan content. Without an id, the selected plan is returned.
#[tauri::command]
pub fn get_plan(
  state: State<'_, Arc<AppState>>,
  plan_id: Option<String>,
) -> Result<PlanDefinition, PlanError> {
  let id = match plan_id {
    Some(raw) => raw.parse::<PlanId>()?,
    None => state.active_plan(),
  };
  Ok(state.catalog.get(id).clone())
}

#[tauri::command]
pub fn get_selected_plan(state: State<'_, Arc<AppState>>) -> PlanId {
  state.active_plan()
}

/// Switch plans and reload progress. Unknown ids change nothing.
#[tauri::command]
pub async fn select_plan(
  state: State<'_, Arc<AppState>>,
  plan_id: String,
) -> Result<ProgressSnapshot, String> {
  Ok(state.switch_plan(&plan_id).await)
}
