//! Pre-authored plan source.

use async_trait::async_trait;

use planloom_core::planner::{PlanError, Planner, PlannerContext};
use planloom_core::types::Plan;

/// Planner that returns a fixed plan regardless of the instruction.
///
/// Stands in for a language-model planner when plans are authored by hand or
/// loaded from files. Every function the plan calls must be advertised in the
/// planner context.
pub struct StaticPlanner {
    plan: Plan,
}

impl StaticPlanner {
    pub fn new(plan: Plan) -> Self {
        Self { plan }
    }
}

#[async_trait]
impl Planner for StaticPlanner {
    async fn plan(&self, instruction: &str, context: &PlannerContext) -> Result<Plan, PlanError> {
        if context.available_functions.is_empty() && !self.plan.called_functions().is_empty() {
            return Err(PlanError::NoSuitableFunctions);
        }
        if let Some(missing) = self
            .plan
            .called_functions()
            .into_iter()
            .find(|name| context.get_function(name).is_none())
        {
            return Err(PlanError::Generation(format!(
                "plan calls '{}' which is not available",
                missing
            )));
        }
        tracing::debug!(
            instruction = %instruction,
            steps = self.plan.node_count(),
            "static plan selected"
        );
        let mut plan = self.plan.clone();
        if plan.goal.is_empty() {
            plan.goal = instruction.to_string();
        }
        Ok(plan)
    }
}
