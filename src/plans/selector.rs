use std::sync::Arc;
use tracing::{debug, info};

use super::PlanId;
use crate::storage::{LocalStorage, SELECTED_PLAN_STORAGE_KEY};

/// Remembers which plan is active between launches
#[derive(Clone)]
pub struct PlanSelector {
  storage: Arc<dyn LocalStorage>,
}

impl PlanSelector {
  pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
    Self { storage }
  }

  /// Persisted plan if it is still in the catalog, otherwise the default
  pub fn resolve(&self) -> PlanId {
    self
      .storage
      .get(SELECTED_PLAN_STORAGE_KEY)
      .and_then(|raw| raw.parse().ok())
      .unwrap_or(PlanId::DEFAULT)
  }

  /// Switch to `raw` if it names a known plan. Unknown ids change nothing.
  pub fn select(&self, raw: &str) -> Option<PlanId> {
    let Ok(plan_id) = raw.parse::<PlanId>() else {
      debug!(plan = raw, "Ignoring unknown plan selection");
      return None;
    };

    self.storage.set(SELECTED_PLAN_STORAGE_KEY, plan_id.as_str());
    info!(plan = %plan_id, "Plan selected");
    Some(plan_id)
  }
}
