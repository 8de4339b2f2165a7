//! The client calls behind the plan controller.

use async_trait::async_trait;

use crate::{
    Error,
    plan::{Plan, PlanId, PlanItemDraft},
};

/// Remote access to monthly spending plans.
#[async_trait]
pub trait PlanClient: Send + Sync {
    /// Fetch every plan for `year`/`month`.
    async fn list_plans(&self, year: i32, month: u8) -> Result<Vec<Plan>, Error>;

    /// Fetch a single plan by ID.
    async fn get_plan(&self, id: PlanId) -> Result<Plan, Error>;

    /// Fetch the plan attached to a budget item for `year`/`month`, if one
    /// exists.
    async fn get_plan_by_item(
        &self,
        budget_item_id: i64,
        year: i32,
        month: u8,
    ) -> Result<Option<Plan>, Error>;

    /// Create an empty plan for a budget item.
    async fn create_plan(&self, budget_item_id: i64, year: i32, month: u8)
    -> Result<Plan, Error>;

    /// Replace a plan's items wholesale.
    async fn update_plan(&self, id: PlanId, items: &[PlanItemDraft]) -> Result<Plan, Error>;

    /// Delete a plan.
    async fn delete_plan(&self, id: PlanId) -> Result<(), Error>;
}
