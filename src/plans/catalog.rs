use serde::Serialize;
use tracing::info;

use super::{PlanDefinition, PlanError, PlanId};

/// Embedded plan document for each id
fn plan_source(id: PlanId) -> &'static str {
  match id {
    PlanId::TenK => include_str!("data/10k.json"),
    PlanId::FiveKSub25 => include_str!("data/5k-sub-25.json"),
  }
}

/// Listing entry for the plan switcher
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
  pub id: PlanId,
  pub name: String,
  pub description: String,
  pub week_count: usize,
  pub workout_count: usize,
}

/// Every plan definition, loaded once at startup
#[derive(Debug, Clone)]
pub struct PlanCatalog {
  /// Indexed by `PlanId::index`
  plans: Vec<PlanDefinition>,
}

impl PlanCatalog {
  pub fn load() -> Result<Self, PlanError> {
    let plans = PlanId::ALL
      .into_iter()
      .map(|id| PlanDefinition::from_json(id, plan_source(id)))
      .collect::<Result<Vec<_>, _>>()?;

    for plan in &plans {
      info!(
        plan = %plan.id,
        weeks = plan.weeks.len(),
        workouts = plan.total_workouts(),
        "Loaded plan"
      );
    }

    Ok(Self { plans })
  }

  pub fn get(&self, id: PlanId) -> &PlanDefinition {
    &self.plans[id.index()]
  }

  pub fn summaries(&self) -> Vec<PlanSummary> {
    self
      .plans
      .iter()
      .map(|plan| PlanSummary {
        id: plan.id,
        name: plan.name.clone(),
        description: plan.description.clone(),
        week_count: plan.weeks.len(),
        workout_count: plan.total_workouts(),
      })
      .collect()
  }
}
