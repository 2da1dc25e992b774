//! Static training plans
//!
//! Plans are compiled into the binary as JSON documents and parsed once at
//! startup. Nothing in here is ever mutated after loading.

pub mod catalog;
pub mod definition;
pub mod icons;
pub mod selector;

pub use catalog::{PlanCatalog, PlanSummary};
pub use definition::{PlanDefinition, PlanPhase};
pub use icons::WorkoutIcon;
pub use selector::PlanSelector;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
  #[error("Unknown plan: {0}")]
  UnknownPlan(String),

  #[error("Invalid workout id: {0}")]
  InvalidWorkoutId(String),

  #[error("Failed to parse plan {plan}: {source}")]
  Parse {
    plan: PlanId,
    #[source]
    source: serde_json::Error,
  },

  #[error("Invalid plan {plan}: {reason}")]
  Invalid { plan: PlanId, reason: String },
}

impl Serialize for PlanError {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(&self.to_string())
  }
}

/// ---------------------------------------------------------------------------
/// Plan Identifiers
/// ---------------------------------------------------------------------------

/// Every plan shipped with the app. Ids outside this set cannot be
/// constructed, so catalog lookups never miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PlanId {
  #[serde(rename = "10k")]
  TenK,
  #[serde(rename = "5k-sub-25")]
  FiveKSub25,
}

impl PlanId {
  pub const ALL: [PlanId; 2] = [PlanId::TenK, PlanId::FiveKSub25];
  pub const DEFAULT: PlanId = PlanId::TenK;

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::TenK => "10k",
      Self::FiveKSub25 => "5k-sub-25",
    }
  }

  /// Position in `ALL`, used as the catalog slot
  pub(crate) fn index(&self) -> usize {
    match self {
      Self::TenK => 0,
      Self::FiveKSub25 => 1,
    }
  }
}

impl Default for PlanId {
  fn default() -> Self {
    Self::DEFAULT
  }
}

impl fmt::Display for PlanId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for PlanId {
  type Err = PlanError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|id| id.as_str() == s.trim())
      .ok_or_else(|| PlanError::UnknownPlan(s.to_string()))
  }
}

/// ---------------------------------------------------------------------------
/// Workout Identifiers
/// ---------------------------------------------------------------------------

/// `{week number}-{ordinal index within week}`, e.g. `"3-1"`.
///
/// Stable only while the workout keeps its position in the week; reordering
/// a week's workouts moves existing completion marks to other workouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WorkoutId {
  pub week: u32,
  pub index: usize,
}

impl WorkoutId {
  pub fn new(week: u32, index: usize) -> Self {
    Self { week, index }
  }
}

impl fmt::Display for WorkoutId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}-{}", self.week, self.index)
  }
}

impl FromStr for WorkoutId {
  type Err = PlanError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let invalid = || PlanError::InvalidWorkoutId(s.to_string());
    let (week, index) = s.trim().split_once('-').ok_or_else(invalid)?;

    Ok(Self {
      week: week.parse().map_err(|_| invalid())?,
      index: index.parse().map_err(|_| invalid())?,
    })
  }
}

impl TryFrom<String> for WorkoutId {
  type Error = PlanError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

impl From<WorkoutId> for String {
  fn from(id: WorkoutId) -> Self {
    id.to_string()
  }
}
