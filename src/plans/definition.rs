use serde::{Deserialize, Serialize};

use super::{PlanError, PlanId, WorkoutIcon, WorkoutId};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutDefinition {
  pub day: String,
  #[serde(rename = "type")]
  pub kind: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub duration: Option<String>,
  pub description: String,
  #[serde(default)]
  pub icon: WorkoutIcon,
  #[serde(default, rename = "hr", skip_serializing_if = "Option::is_none")]
  pub heart_rate: Option<String>,
  #[serde(default, rename = "hrColor", skip_serializing_if = "Option::is_none")]
  pub heart_rate_color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekDefinition {
  #[serde(rename = "week")]
  pub number: u32,
  pub phase: String,
  pub focus: String,
  /// Display hint for the week card
  #[serde(default)]
  pub color: String,
  pub workouts: Vec<WorkoutDefinition>,
}

impl WeekDefinition {
  pub fn workout_id(&self, index: usize) -> WorkoutId {
    WorkoutId::new(self.number, index)
  }

  pub fn workout_ids(&self) -> impl Iterator<Item = WorkoutId> + '_ {
    (0..self.workouts.len()).map(move |index| self.workout_id(index))
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartRateZone {
  pub zone: String,
  pub label: String,
  pub bpm: String,
  pub max_hr_pct: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDefinition {
  pub id: PlanId,
  pub name: String,
  pub description: String,
  #[serde(default)]
  pub heart_rate_zones: Vec<HeartRateZone>,
  pub weeks: Vec<WeekDefinition>,
}

/// A run of consecutive weeks sharing a phase label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanPhase {
  pub phase: String,
  pub first_week: u32,
  pub last_week: u32,
  pub workout_count: usize,
  /// Workouts in this phase and every phase before it
  pub cumulative_workouts: usize,
}

impl PlanDefinition {
  /// Parse and validate one embedded plan document
  pub fn from_json(expected: PlanId, json: &str) -> Result<Self, PlanError> {
    let plan: PlanDefinition =
      serde_json::from_str(json).map_err(|source| PlanError::Parse { plan: expected, source })?;

    if plan.id != expected {
      return Err(PlanError::Invalid {
        plan: expected,
        reason: format!("document declares id {}", plan.id),
      });
    }

    plan.validate()?;
    Ok(plan)
  }

  fn validate(&self) -> Result<(), PlanError> {
    let invalid = |reason: String| PlanError::Invalid { plan: self.id, reason };

    if self.weeks.is_empty() {
      return Err(invalid("plan has no weeks".into()));
    }

    for (position, week) in self.weeks.iter().enumerate() {
      let expected = position as u32 + 1;
      if week.number != expected {
        return Err(invalid(format!(
          "week {} found where week {} was expected",
          week.number, expected
        )));
      }
      if week.workouts.is_empty() {
        return Err(invalid(format!("week {} has no workouts", week.number)));
      }
    }

    Ok(())
  }

  pub fn total_workouts(&self) -> usize {
    self.weeks.iter().map(|week| week.workouts.len()).sum()
  }

  pub fn week(&self, number: u32) -> Option<&WeekDefinition> {
    self.weeks.iter().find(|week| week.number == number)
  }

  pub fn workout(&self, id: WorkoutId) -> Option<&WorkoutDefinition> {
    self.week(id.week)?.workouts.get(id.index)
  }

  pub fn contains_workout(&self, id: WorkoutId) -> bool {
    self.workout(id).is_some()
  }

  /// All workout ids in catalog order
  pub fn workout_ids(&self) -> impl Iterator<Item = WorkoutId> + '_ {
    self.weeks.iter().flat_map(|week| week.workout_ids())
  }

  pub fn phases(&self) -> Vec<PlanPhase> {
    let mut phases: Vec<PlanPhase> = Vec::new();
    let mut cumulative = 0;

    for week in &self.weeks {
      cumulative += week.workouts.len();
      match phases.last_mut() {
        Some(current) if current.phase == week.phase => {
          current.last_week = week.number;
          current.workout_count += week.workouts.len();
          current.cumulative_workouts = cumulative;
        }
        _ => phases.push(PlanPhase {
          phase: week.phase.clone(),
          first_week: week.number,
          last_week: week.number,
          workout_count: week.workouts.len(),
          cumulative_workouts: cumulative,
        }),
      }
    }

    phases
  }
}
