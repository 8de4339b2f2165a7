//! The client calls behind the budget controller.

use async_trait::async_trait;

use crate::{
    Error,
    budget::{
        Budget, BudgetId, BudgetItem, BudgetItemId, ItemPatch, Section, SectionId, SectionPatch,
        YearlySummary,
    },
};

/// Remote access to monthly budgets and yearly summaries.
#[async_trait]
pub trait BudgetClient: Send + Sync {
    /// Fetch the budget for `year`/`month`. With `create_if_missing` the
    /// server creates an empty budget instead of answering 404.
    async fn get_budget(
        &self,
        year: i32,
        month: u8,
        create_if_missing: bool,
    ) -> Result<Budget, Error>;

    /// Fetch the per-month summary for `year`.
    async fn get_yearly_summary(&self, year: i32) -> Result<YearlySummary, Error>;

    /// Create an empty budget for `year`/`month`.
    async fn create_budget(&self, year: i32, month: u8) -> Result<Budget, Error>;
}

/// Remote access to budget sections.
#[async_trait]
pub trait SectionClient: Send + Sync {
    /// Create a section within a budget. Returns the server's
    /// representation, which carries the assigned ID and display order.
    async fn create_section(
        &self,
        budget_id: BudgetId,
        name: &str,
        is_income: bool,
    ) -> Result<Section, Error>;

    /// Apply a partial update to a section.
    async fn update_section(&self, id: SectionId, patch: &SectionPatch)
    -> Result<Section, Error>;

    /// Delete a section and every item in it.
    async fn delete_section(&self, id: SectionId) -> Result<(), Error>;
}

/// Remote access to budget items.
#[async_trait]
pub trait ItemClient: Send + Sync {
    /// Create an item within a section.
    async fn create_item(
        &self,
        section_id: SectionId,
        name: &str,
        planned_amount: f64,
        actual_amount: f64,
    ) -> Result<BudgetItem, Error>;

    /// Apply a partial update to an item.
    async fn update_item(&self, id: BudgetItemId, patch: &ItemPatch)
    -> Result<BudgetItem, Error>;

    /// Delete an item.
    async fn delete_item(&self, id: BudgetItemId) -> Result<(), Error>;
}
