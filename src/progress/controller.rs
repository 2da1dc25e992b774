//! In-memory owner of the active session's completion state
//!
//! Session lifecycle: `Uninitialized -> Loading -> Ready`. Every change is
//! published as an immutable `ProgressSnapshot` on a watch channel. Toggles
//! update memory first and then push the full state to the store in a
//! background task that nobody waits on.

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::state::{next_incomplete_week, next_milestone, progress_percentage, CompletionState};
use super::store::{DocumentKey, DocumentStore, ProgressStore};
use crate::identity::Identity;
use crate::plans::{PlanCatalog, PlanDefinition, PlanId, PlanPhase, WorkoutId};

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProgressError {
  #[error("Progress is not loaded yet")]
  NotReady,

  #[error("Week {0} is not part of the active plan")]
  UnknownWeek(u32),

  #[error("Workout {0} is not part of the active plan")]
  UnknownWorkout(WorkoutId),

  #[error("Invalid workout id: {0}")]
  InvalidWorkoutId(String),
}

impl Serialize for ProgressError {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(&self.to_string())
  }
}

/// ---------------------------------------------------------------------------
/// Session Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
  Uninitialized,
  Loading,
  Ready,
}

/// The (identity, plan) pair a session belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKey {
  pub identity: Identity,
  pub plan_id: PlanId,
}

impl SessionKey {
  pub fn new(identity: Identity, plan_id: PlanId) -> Self {
    Self { identity, plan_id }
  }

  pub fn document_key(&self) -> DocumentKey {
    DocumentKey::new(&self.identity, self.plan_id)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
  pub phase: SessionPhase,
  pub identity: Option<Identity>,
  pub plan_id: Option<PlanId>,
  pub completed_weeks: Vec<u32>,
  pub completed_workouts: Vec<WorkoutId>,
  pub completed_week_count: usize,
  pub completed_workout_count: usize,
  pub total_workouts: usize,
  pub progress_percentage: u8,
  pub next_incomplete_week: Option<u32>,
  pub next_milestone: Option<PlanPhase>,
}

impl ProgressSnapshot {
  fn uninitialized() -> Self {
    Self {
      phase: SessionPhase::Uninitialized,
      identity: None,
      plan_id: None,
      completed_weeks: Vec::new(),
      completed_workouts: Vec::new(),
      completed_week_count: 0,
      completed_workout_count: 0,
      total_workouts: 0,
      progress_percentage: 0,
      next_incomplete_week: None,
      next_milestone: None,
    }
  }

  fn build(phase: SessionPhase, key: &SessionKey, plan: &PlanDefinition, state: &CompletionState) -> Self {
    let completed = state.completed_workouts.len();
    let total = plan.total_workouts();

    Self {
      phase,
      identity: Some(key.identity.clone()),
      plan_id: Some(key.plan_id),
      completed_weeks: state.completed_weeks.iter().copied().collect(),
      completed_workouts: state.completed_workouts.iter().copied().collect(),
      completed_week_count: state.completed_weeks.len(),
      completed_workout_count: completed,
      total_workouts: total,
      progress_percentage: progress_percentage(completed, total),
      next_incomplete_week: next_incomplete_week(plan, state),
      next_milestone: next_milestone(plan, completed),
    }
  }
}

struct Session {
  phase: SessionPhase,
  key: Option<SessionKey>,
  /// Bumped on every activate/deactivate so late loads can tell they are stale
  generation: u64,
  state: CompletionState,
}

struct LoadTicket {
  generation: u64,
  key: SessionKey,
}

/// ---------------------------------------------------------------------------
/// Progress Controller
/// ---------------------------------------------------------------------------

pub struct ProgressController<S: DocumentStore> {
  store: ProgressStore<S>,
  catalog: Arc<PlanCatalog>,
  session: Mutex<Session>,
  snapshots: watch::Sender<ProgressSnapshot>,
  pending_saves: Mutex<Vec<JoinHandle<()>>>,
}

fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  match mutex.lock() {
    Ok(guard) => guard,
    Err(poisoned) => poisoned.into_inner(),
  }
}

impl<S: DocumentStore> ProgressController<S> {
  pub fn new(documents: S, catalog: Arc<PlanCatalog>) -> Self {
    let (snapshots, _) = watch::channel(ProgressSnapshot::uninitialized());

    Self {
      store: ProgressStore::new(documents),
      catalog,
      session: Mutex::new(Session {
        phase: SessionPhase::Uninitialized,
        key: None,
        generation: 0,
        state: CompletionState::default(),
      }),
      snapshots,
      pending_saves: Mutex::new(Vec::new()),
    }
  }

  #[cfg(test)]
  pub fn store(&self) -> &ProgressStore<S> {
    &self.store
  }

  #[cfg(test)]
  pub fn catalog(&self) -> &PlanCatalog {
    &self.catalog
  }

  pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
    self.snapshots.subscribe()
  }

  pub fn snapshot(&self) -> ProgressSnapshot {
    let session = lock_or_recover(&self.session);
    self.build_snapshot(&session)
  }

  pub fn active_key(&self) -> Option<SessionKey> {
    lock_or_recover(&self.session).key.clone()
  }

  /// Start a session for `(identity, plan_id)` and wait for its progress.
  ///
  /// Whatever was in memory is discarded immediately. If another activate or
  /// deactivate happens while the load is in flight, this load's result is
  /// dropped and the returned snapshot reflects the newer session.
  pub async fn activate(&self, identity: Identity, plan_id: PlanId) -> ProgressSnapshot {
    let ticket = self.begin_loading(SessionKey::new(identity, plan_id));
    let state = self.store.load(&ticket.key.identity, ticket.key.plan_id).await;
    self.finish_loading(ticket, state);
    self.snapshot()
  }

  /// Forget the active session (identity cleared)
  pub fn deactivate(&self) -> ProgressSnapshot {
    let mut session = lock_or_recover(&self.session);
    session.generation += 1;
    session.phase = SessionPhase::Uninitialized;
    session.key = None;
    session.state = CompletionState::default();
    info!("Progress session closed");
    self.publish(&session)
  }

  pub fn toggle_week(&self, week: u32) -> Result<ProgressSnapshot, ProgressError> {
    self.mutate(|plan, state| {
      if plan.week(week).is_none() {
        return Err(ProgressError::UnknownWeek(week));
      }
      state.toggle_week(week);
      Ok(())
    })
  }

  pub fn toggle_workout(&self, id: WorkoutId) -> Result<ProgressSnapshot, ProgressError> {
    self.mutate(|plan, state| {
      if !plan.contains_workout(id) {
        return Err(ProgressError::UnknownWorkout(id));
      }
      state.toggle_workout(id);
      Ok(())
    })
  }

  /// Wait for every save spawned so far
  pub async fn flush(&self) {
    let handles = std::mem::take(&mut *lock_or_recover(&self.pending_saves));
    for handle in handles {
      if let Err(e) = handle.await {
        warn!(error = %e, "Progress save task failed");
      }
    }
  }

  fn begin_loading(&self, key: SessionKey) -> LoadTicket {
    let mut session = lock_or_recover(&self.session);
    session.generation += 1;
    session.phase = SessionPhase::Loading;
    session.key = Some(key.clone());
    session.state = CompletionState::default();
    info!(identity = %key.identity, plan = %key.plan_id, "Loading progress");
    self.publish(&session);

    LoadTicket {
      generation: session.generation,
      key,
    }
  }

  fn finish_loading(&self, ticket: LoadTicket, state: CompletionState) -> bool {
    let mut session = lock_or_recover(&self.session);
    if session.generation != ticket.generation {
      debug!(key = %ticket.key.document_key(), "Discarding stale progress load");
      return false;
    }

    session.phase = SessionPhase::Ready;
    session.state = state;
    self.publish(&session);
    true
  }

  fn mutate<F>(&self, apply: F) -> Result<ProgressSnapshot, ProgressError>
  where
    F: FnOnce(&PlanDefinition, &mut CompletionState) -> Result<(), ProgressError>,
  {
    let (key, state, snapshot) = {
      let mut session = lock_or_recover(&self.session);
      let key = match (&session.phase, &session.key) {
        (SessionPhase::Ready, Some(key)) => key.clone(),
        _ => return Err(ProgressError::NotReady),
      };

      apply(self.catalog.get(key.plan_id), &mut session.state)?;
      let snapshot = self.publish(&session);
      (key, session.state.clone(), snapshot)
    };

    self.spawn_save(key, state);
    Ok(snapshot)
  }

  /// Push the full state under the key captured at toggle time
  fn spawn_save(&self, key: SessionKey, state: CompletionState) {
    let store = self.store.clone();
    let handle = tokio::spawn(async move {
      store.save(&key.identity, key.plan_id, &state).await;
    });

    let mut pending = lock_or_recover(&self.pending_saves);
    pending.retain(|handle| !handle.is_finished());
    pending.push(handle);
  }

  fn build_snapshot(&self, session: &Session) -> ProgressSnapshot {
    match &session.key {
      Some(key) => ProgressSnapshot::build(
        session.phase,
        key,
        self.catalog.get(key.plan_id),
        &session.state,
      ),
      None => ProgressSnapshot::uninitialized(),
    }
  }

  fn publish(&self, session: &Session) -> ProgressSnapshot {
    let snapshot = self.build_snapshot(session);
    self.snapshots.send_replace(snapshot.clone());
    snapshot
  }
}
