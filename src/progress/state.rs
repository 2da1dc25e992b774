use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::plans::{PlanDefinition, PlanPhase, WorkoutId};

/// Completed weeks and workouts for one (identity, plan) pair.
///
/// Week marks and workout marks are independent: marking a week does not
/// mark its workouts and vice versa.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionState {
  pub completed_weeks: BTreeSet<u32>,
  pub completed_workouts: BTreeSet<WorkoutId>,
}

impl CompletionState {
  pub fn is_empty(&self) -> bool {
    self.completed_weeks.is_empty() && self.completed_workouts.is_empty()
  }

  /// Flip a week's mark. Returns whether the week is now complete.
  pub fn toggle_week(&mut self, week: u32) -> bool {
    if self.completed_weeks.remove(&week) {
      false
    } else {
      self.completed_weeks.insert(week)
    }
  }

  /// Flip a workout's mark. Returns whether the workout is now complete.
  pub fn toggle_workout(&mut self, id: WorkoutId) -> bool {
    if self.completed_workouts.remove(&id) {
      false
    } else {
      self.completed_workouts.insert(id)
    }
  }

  pub fn is_week_complete(&self, week: u32) -> bool {
    self.completed_weeks.contains(&week)
  }

  pub fn is_workout_complete(&self, id: WorkoutId) -> bool {
    self.completed_workouts.contains(&id)
  }
}

/// ---------------------------------------------------------------------------
/// Derived metrics
/// ---------------------------------------------------------------------------

/// `round(100 * completed / total)`, clamped to 0..=100. Halves round up.
pub fn progress_percentage(completed: usize, total: usize) -> u8 {
  if total == 0 {
    return 0;
  }
  let completed = completed.min(total) as u64;
  let total = total as u64;
  ((200 * completed + total) / (2 * total)) as u8
}

/// First week, in plan order, with at least one workout not yet completed
pub fn next_incomplete_week(plan: &PlanDefinition, state: &CompletionState) -> Option<u32> {
  plan
    .weeks
    .iter()
    .find(|week| week.workout_ids().any(|id| !state.is_workout_complete(id)))
    .map(|week| week.number)
}

/// First phase whose cumulative workout count is still ahead of the number of
/// completed workouts. Once everything is done the race phase stays the
/// milestone.
pub fn next_milestone(plan: &PlanDefinition, completed: usize) -> Option<PlanPhase> {
  let mut phases = plan.phases();
  match phases.iter().position(|phase| completed < phase.cumulative_workouts) {
    Some(index) => Some(phases.swap_remove(index)),
    None => phases.pop(),
  }
}
