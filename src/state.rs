use std::sync::Arc;
use tracing::info;

use crate::identity::{IdentityError, IdentityStore};
use crate::plans::{PlanCatalog, PlanId, PlanSelector};
use crate::progress::{ProgressBackend, ProgressController, ProgressSnapshot};
use crate::storage::LocalStorage;

/// Application state shared by every command
pub struct AppState {
  pub catalog: Arc<PlanCatalog>,
  pub identity: IdentityStore,
  pub plans: PlanSelector,
  pub progress: ProgressController<ProgressBackend>,
}

impl AppState {
  pub fn new(storage: Arc<dyn LocalStorage>, backend: ProgressBackend, catalog: Arc<PlanCatalog>) -> Self {
    Self {
      identity: IdentityStore::new(Arc::clone(&storage)),
      plans: PlanSelector::new(storage),
      progress: ProgressController::new(backend, Arc::clone(&catalog)),
      catalog,
    }
  }

  /// Load progress for the persisted identity and plan, if there is an identity
  pub async fn resume(&self) -> ProgressSnapshot {
    match self.identity.resolve() {
      Some(identity) => {
        let plan_id = self.plans.resolve();
        info!(identity = %identity, plan = %plan_id, "Resuming session");
        self.progress.activate(identity, plan_id).await
      }
      None => {
        info!("No identity yet, waiting for username");
        self.progress.snapshot()
      }
    }
  }

  /// Accept a username from the entry form and load its progress
  pub async fn sign_in(&self, raw: &str) -> Result<ProgressSnapshot, IdentityError> {
    let identity = self.identity.set(raw)?;
    Ok(self.progress.activate(identity, self.plans.resolve()).await)
  }

  /// "Change user": forget the identity and drop the in-memory progress
  pub fn sign_out(&self) -> ProgressSnapshot {
    self.identity.clear();
    self.progress.deactivate()
  }

  /// Switch plans. Unknown ids leave everything as it was.
  ///
  /// The running session's identity wins over storage so the controller
  /// always follows the selector.
  pub async fn switch_plan(&self, raw: &str) -> ProgressSnapshot {
    let Some(plan_id) = self.plans.select(raw) else {
      return self.progress.snapshot();
    };

    let identity = self
      .progress
      .active_key()
      .map(|key| key.identity)
      .or_else(|| self.identity.resolve());

    match identity {
      Some(identity) => self.progress.activate(identity, plan_id).await,
      None => self.progress.snapshot(),
    }
  }

  pub fn active_plan(&self) -> PlanId {
    self.plans.resolve()
  }
}
