//! The monthly budget: sections, budget items, derived totals, and the
//! controller that keeps the local copy in sync with the remote service.
//!
//! The server is authoritative for totals on fetch; after any local
//! structural change to sections or items the aggregates are restored by an
//! explicit [Budget::recalculate_totals] pass, never maintained per-field.
//! When the service is unreachable, fetches fall back to a synthetic offline
//! budget so the presentation layer always has something to render.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::{
    Error, amount,
    clients::{BudgetClient, ItemClient, SectionClient},
};

/// The ID of a [Budget] on the remote service.
pub type BudgetId = i64;
/// The ID of a [Section] on the remote service.
pub type SectionId = i64;
/// The ID of a [BudgetItem] on the remote service.
pub type BudgetItemId = i64;

/// One month's budget: an ordered list of sections plus the four top-level
/// totals derived from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    /// The server-side ID. `None` marks a synthetic offline placeholder that
    /// was never persisted.
    pub id: Option<BudgetId>,
    /// The calendar year this budget covers.
    pub year: i32,
    /// The calendar month (1-12) this budget covers.
    pub month: u8,
    /// The sections in display order.
    #[serde(default)]
    pub sections: Vec<Section>,
    /// Total planned amount across income sections.
    #[serde(default)]
    pub total_planned_income: f64,
    /// Total actual amount across income sections.
    #[serde(default, rename = "totalIncome")]
    pub total_income: f64,
    /// Total planned amount across expense sections.
    #[serde(default)]
    pub total_planned_expenses: f64,
    /// Total actual amount across expense sections.
    #[serde(default, rename = "totalExpenses")]
    pub total_expenses: f64,
    /// Whether this budget was synthesized locally because the remote
    /// service was unreachable. Never set by the server.
    #[serde(default)]
    pub is_offline: bool,
    /// When the budget was created, as reported by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// A named group of budget items, either income or expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    /// The server-side ID. `None` for the offline skeleton sections.
    #[serde(default)]
    pub id: Option<SectionId>,
    /// The section name, e.g. "Housing".
    pub name: String,
    /// Render/iteration order. Not enforced server-side.
    #[serde(default)]
    pub display_order: i32,
    /// Whether the section counts toward income rather than expenses.
    #[serde(default)]
    pub is_income: bool,
    /// The items in this section.
    #[serde(default)]
    pub items: Vec<BudgetItem>,
    /// Derived: the sum of the items' planned amounts.
    #[serde(default)]
    pub total_planned: f64,
    /// Derived: the sum of the items' actual amounts.
    #[serde(default)]
    pub total_actual: f64,
}

/// A single line item within a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetItem {
    /// The server-side ID.
    pub id: BudgetItemId,
    /// The item name, e.g. "Rent".
    pub name: String,
    /// The amount budgeted for the month.
    #[serde(default, deserialize_with = "amount::lenient_f64")]
    pub planned_amount: f64,
    /// The amount actually spent or earned so far.
    #[serde(default, deserialize_with = "amount::lenient_f64")]
    pub actual_amount: f64,
    /// Render order within the section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_order: Option<i32>,
    /// Server-derived planned minus actual.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difference: Option<f64>,
    /// Whether the item is excluded from the budget's aggregates server-side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_excluded_from_budget: Option<bool>,
    /// The spending plan attached to this item, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<i64>,
}

/// A partial update to a [Section]. Fields left `None` are not sent.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionPatch {
    /// A new name for the section.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Move the section between the income and expense groups.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_income: Option<bool>,
    /// A new render position.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_order: Option<i32>,
}

/// A partial update to a [BudgetItem]. Fields left `None` are not sent.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPatch {
    /// A new name for the item.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// A new planned amount.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planned_amount: Option<f64>,
    /// A new actual amount.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_amount: Option<f64>,
}

/// A year's worth of per-month budget figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlySummary {
    /// The calendar year the summary covers.
    pub year: i32,
    /// One entry per month that has a budget.
    #[serde(default)]
    pub months: Vec<MonthSummary>,
    /// Planned income summed over the year.
    #[serde(default)]
    pub total_planned_income: f64,
    /// Actual income summed over the year.
    #[serde(default)]
    pub total_actual_income: f64,
    /// Planned expenses summed over the year.
    #[serde(default)]
    pub total_planned_expenses: f64,
    /// Actual expenses summed over the year.
    #[serde(default)]
    pub total_actual_expenses: f64,
    /// Planned savings (income minus expenses) summed over the year.
    #[serde(default)]
    pub total_planned_savings: f64,
    /// Actual savings summed over the year.
    #[serde(default)]
    pub total_actual_savings: f64,
    /// Whether this summary was synthesized locally. Never set by the server.
    #[serde(default)]
    pub is_offline: bool,
}

/// One month's figures within a [YearlySummary].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthSummary {
    /// The calendar month (1-12).
    pub month: u8,
    /// The budget backing this month, if one exists.
    #[serde(default)]
    pub budget_id: Option<BudgetId>,
    /// Planned income for the month.
    #[serde(default)]
    pub planned_income: f64,
    /// Actual income for the month.
    #[serde(default)]
    pub actual_income: f64,
    /// Planned expenses for the month.
    #[serde(default)]
    pub planned_expenses: f64,
    /// Actual expenses for the month.
    #[serde(default)]
    pub actual_expenses: f64,
    /// Planned savings for the month.
    #[serde(default)]
    pub planned_savings: f64,
    /// Actual savings for the month.
    #[serde(default)]
    pub actual_savings: f64,
}

/// The canonical section layout for a freshly synthesized offline budget.
/// Only "Income" counts as income; display order follows list order.
const DEFAULT_SECTIONS: [(&str, bool); 8] = [
    ("Income", true),
    ("Housing", false),
    ("Transportation", false),
    ("Food", false),
    ("Utilities", false),
    ("Healthcare", false),
    ("Entertainment", false),
    ("Savings", false),
];

impl Budget {
    /// Create the offline placeholder budget for `year`/`month`: the eight
    /// default sections with no items and all totals zero. It carries no
    /// server ID and is never persisted.
    pub fn offline(year: i32, month: u8) -> Self {
        let sections = DEFAULT_SECTIONS
            .iter()
            .enumerate()
            .map(|(index, (name, is_income))| Section {
                id: None,
                name: (*name).to_string(),
                display_order: index as i32 + 1,
                is_income: *is_income,
                items: Vec::new(),
                total_planned: 0.0,
                total_actual: 0.0,
            })
            .collect();

        Budget {
            id: None,
            year,
            month,
            sections,
            total_planned_income: 0.0,
            total_income: 0.0,
            total_planned_expenses: 0.0,
            total_expenses: 0.0,
            is_offline: true,
            created_at: None,
        }
    }

    /// Restore the aggregate-consistency invariant: every section total is
    /// the sum over its items, and the four budget totals are the section
    /// totals partitioned by `is_income`. Non-finite amounts contribute
    /// zero rather than turning the totals into NaN.
    pub fn recalculate_totals(&mut self) {
        let mut planned_income = 0.0;
        let mut actual_income = 0.0;
        let mut planned_expenses = 0.0;
        let mut actual_expenses = 0.0;

        for section in &mut self.sections {
            let mut section_planned = 0.0;
            let mut section_actual = 0.0;

            for item in &section.items {
                section_planned += amount::or_zero(item.planned_amount);
                section_actual += amount::or_zero(item.actual_amount);
            }

            section.total_planned = section_planned;
            section.total_actual = section_actual;

            if section.is_income {
                planned_income += section_planned;
                actual_income += section_actual;
            } else {
                planned_expenses += section_planned;
                actual_expenses += section_actual;
            }
        }

        self.total_planned_income = planned_income;
        self.total_income = actual_income;
        self.total_planned_expenses = planned_expenses;
        self.total_expenses = actual_expenses;
    }
}

impl YearlySummary {
    /// Create the zeroed offline placeholder summary for `year`.
    pub fn offline(year: i32) -> Self {
        YearlySummary {
            year,
            months: Vec::new(),
            total_planned_income: 0.0,
            total_actual_income: 0.0,
            total_planned_expenses: 0.0,
            total_actual_expenses: 0.0,
            total_planned_savings: 0.0,
            total_actual_savings: 0.0,
            is_offline: true,
        }
    }
}

#[derive(Debug, Default)]
struct BudgetState {
    current_budget: Option<Budget>,
    yearly_summary: Option<YearlySummary>,
    loading: bool,
    error: Option<String>,
    fetch_seq: u64,
}

/// Holds the current month's budget and the yearly summary, and mediates
/// every mutation through the remote service.
///
/// Error policy: fetches never fail from the caller's point of view — they
/// record an error and substitute offline placeholders. Section and item
/// mutations record errors and leave local state untouched; they do not
/// propagate. Callers that need to know whether a mutation landed must check
/// [error](BudgetController::error) or observe the section list.
#[derive(Debug)]
pub struct BudgetController<C> {
    client: C,
    state: Mutex<BudgetState>,
}

impl<C> BudgetController<C>
where
    C: BudgetClient + SectionClient + ItemClient,
{
    /// Create a controller around `client`. No request is issued until the
    /// first fetch.
    pub fn new(client: C) -> Self {
        Self {
            client,
            state: Mutex::new(BudgetState::default()),
        }
    }

    /// A snapshot of the loaded budget, if any fetch has completed.
    pub fn current_budget(&self) -> Option<Budget> {
        self.state.lock().unwrap().current_budget.clone()
    }

    /// A snapshot of the loaded yearly summary.
    pub fn yearly_summary(&self) -> Option<YearlySummary> {
        self.state.lock().unwrap().yearly_summary.clone()
    }

    /// Whether a fetch is currently in flight.
    pub fn is_loading(&self) -> bool {
        self.state.lock().unwrap().loading
    }

    /// The most recently recorded error message, if any.
    pub fn error(&self) -> Option<String> {
        self.state.lock().unwrap().error.clone()
    }

    /// Whether the loaded budget is the locally synthesized offline
    /// placeholder rather than server data.
    pub fn is_offline(&self) -> bool {
        self.state
            .lock()
            .unwrap()
            .current_budget
            .as_ref()
            .is_some_and(|budget| budget.is_offline)
    }

    fn begin_fetch(&self) -> u64 {
        let mut state = self.state.lock().unwrap();
        state.loading = true;
        state.error = None;
        state.fetch_seq += 1;
        state.fetch_seq
    }

    fn record_error(&self, error: &Error, fallback: &str) {
        tracing::error!("{fallback}: {error}");
        self.state.lock().unwrap().error = Some(error.user_message(fallback));
    }

    /// Fetch the budget for `year`/`month`, letting the server create it if
    /// it does not exist yet. On success the local budget is replaced
    /// wholesale with the server's representation. On failure the error is
    /// recorded and the offline placeholder is substituted instead, so a
    /// budget is always present afterwards.
    pub async fn fetch_budget(&self, year: i32, month: u8) {
        let seq = self.begin_fetch();

        let result = self.client.get_budget(year, month, true).await;

        let mut state = self.state.lock().unwrap();
        if seq != state.fetch_seq {
            tracing::debug!("discarding stale budget response for {year}-{month:02}");
            return;
        }

        match result {
            Ok(budget) => state.current_budget = Some(budget),
            Err(error) => {
                tracing::warn!(
                    "could not fetch budget for {year}-{month:02}, falling back to offline: {error}"
                );
                state.error = Some(error.user_message("Unable to load budget"));
                state.current_budget = Some(Budget::offline(year, month));
            }
        }
        state.loading = false;
    }

    /// Fetch the yearly summary for `year`. On failure a zeroed summary
    /// marked offline is substituted, so consumers never need to null-check
    /// after a fetch.
    pub async fn fetch_yearly_summary(&self, year: i32) {
        let seq = self.begin_fetch();

        let result = self.client.get_yearly_summary(year).await;

        let mut state = self.state.lock().unwrap();
        if seq != state.fetch_seq {
            tracing::debug!("discarding stale yearly summary response for {year}");
            return;
        }

        match result {
            Ok(summary) => state.yearly_summary = Some(summary),
            Err(error) => {
                tracing::warn!("could not fetch yearly summary for {year}: {error}");
                state.error = Some(error.user_message("Unable to load yearly summary"));
                state.yearly_summary = Some(YearlySummary::offline(year));
            }
        }
        state.loading = false;
    }

    /// Create a section in the loaded budget and append the server's
    /// representation. No-op when no budget is loaded; against the offline
    /// placeholder (which has no server ID to attach to) nothing is sent
    /// and the failure is recorded.
    pub async fn add_section(&self, name: &str, is_income: bool) {
        let budget_id = {
            let mut state = self.state.lock().unwrap();
            match state.current_budget.as_ref().and_then(|budget| budget.id) {
                Some(id) => id,
                None => {
                    if state.current_budget.is_some() {
                        state.error = Some("Failed to add section".to_string());
                    }
                    return;
                }
            }
        };

        match self.client.create_section(budget_id, name, is_income).await {
            Ok(section) => {
                let mut state = self.state.lock().unwrap();
                if let Some(budget) = state.current_budget.as_mut() {
                    budget.sections.push(section);
                }
            }
            Err(error) => self.record_error(&error, "Failed to add section"),
        }
    }

    /// Update a section remotely and replace the local copy by ID.
    pub async fn update_section(&self, section_id: SectionId, patch: &SectionPatch) {
        match self.client.update_section(section_id, patch).await {
            Ok(updated) => {
                let mut state = self.state.lock().unwrap();
                if let Some(budget) = state.current_budget.as_mut()
                    && let Some(section) = budget
                        .sections
                        .iter_mut()
                        .find(|section| section.id == Some(section_id))
                {
                    *section = updated;
                }
            }
            Err(error) => self.record_error(&error, "Failed to update section"),
        }
    }

    /// Delete a section remotely and drop the local copy.
    pub async fn delete_section(&self, section_id: SectionId) {
        match self.client.delete_section(section_id).await {
            Ok(()) => {
                let mut state = self.state.lock().unwrap();
                if let Some(budget) = state.current_budget.as_mut() {
                    budget
                        .sections
                        .retain(|section| section.id != Some(section_id));
                }
            }
            Err(error) => self.record_error(&error, "Failed to delete section"),
        }
    }

    /// Create an item in the given section (actual amount starts at zero)
    /// and recompute the aggregates.
    pub async fn add_item(&self, section_id: SectionId, name: &str, planned_amount: f64) {
        match self
            .client
            .create_item(section_id, name, planned_amount, 0.0)
            .await
        {
            Ok(item) => {
                let mut state = self.state.lock().unwrap();
                if let Some(budget) = state.current_budget.as_mut() {
                    if let Some(section) = budget
                        .sections
                        .iter_mut()
                        .find(|section| section.id == Some(section_id))
                    {
                        section.items.push(item);
                    }
                    budget.recalculate_totals();
                }
            }
            Err(error) => self.record_error(&error, "Failed to add item"),
        }
    }

    /// Update an item remotely, replace the local copy within its parent
    /// section, and recompute the aggregates.
    pub async fn update_item(
        &self,
        section_id: SectionId,
        item_id: BudgetItemId,
        patch: &ItemPatch,
    ) {
        match self.client.update_item(item_id, patch).await {
            Ok(updated) => {
                let mut state = self.state.lock().unwrap();
                if let Some(budget) = state.current_budget.as_mut() {
                    if let Some(section) = budget
                        .sections
                        .iter_mut()
                        .find(|section| section.id == Some(section_id))
                        && let Some(item) =
                            section.items.iter_mut().find(|item| item.id == item_id)
                    {
                        *item = updated;
                    }
                    budget.recalculate_totals();
                }
            }
            Err(error) => self.record_error(&error, "Failed to update item"),
        }
    }

    /// Delete an item remotely, drop the local copy, and recompute the
    /// aggregates.
    pub async fn delete_item(&self, section_id: SectionId, item_id: BudgetItemId) {
        match self.client.delete_item(item_id).await {
            Ok(()) => {
                let mut state = self.state.lock().unwrap();
                if let Some(budget) = state.current_budget.as_mut() {
                    if let Some(section) = budget
                        .sections
                        .iter_mut()
                        .find(|section| section.id == Some(section_id))
                    {
                        section.items.retain(|item| item.id != item_id);
                    }
                    budget.recalculate_totals();
                }
            }
            Err(error) => self.record_error(&error, "Failed to delete item"),
        }
    }

    /// Recompute the loaded budget's aggregates in place. No-op when no
    /// budget is loaded.
    pub fn recalculate_totals(&self) {
        if let Some(budget) = self.state.lock().unwrap().current_budget.as_mut() {
            budget.recalculate_totals();
        }
    }
}

#[cfg(test)]
fn test_item(id: BudgetItemId, planned: f64, actual: f64) -> BudgetItem {
    BudgetItem {
        id,
        name: format!("Item {id}"),
        planned_amount: planned,
        actual_amount: actual,
        display_order: None,
        difference: None,
        is_excluded_from_budget: None,
        plan_id: None,
    }
}

#[cfg(test)]
fn test_section(id: SectionId, is_income: bool, items: Vec<BudgetItem>) -> Section {
    Section {
        id: Some(id),
        name: format!("Section {id}"),
        display_order: id as i32,
        is_income,
        items,
        total_planned: 0.0,
        total_actual: 0.0,
    }
}

#[cfg(test)]
fn test_budget(sections: Vec<Section>) -> Budget {
    Budget {
        id: Some(1),
        year: 2025,
        month: 6,
        sections,
        total_planned_income: 0.0,
        total_income: 0.0,
        total_planned_expenses: 0.0,
        total_expenses: 0.0,
        is_offline: false,
        created_at: None,
    }
}

#[cfg(test)]
mod recalculate_totals_tests {
    use super::{test_budget, test_item, test_section};

    #[test]
    fn sums_items_into_section_totals() {
        let mut budget = test_budget(vec![test_section(
            1,
            false,
            vec![test_item(1, 100.0, 80.0), test_item(2, 50.0, 75.5)],
        )]);

        budget.recalculate_totals();

        assert_eq!(150.0, budget.sections[0].total_planned);
        assert_eq!(155.5, budget.sections[0].total_actual);
    }

    #[test]
    fn partitions_budget_totals_by_income_flag() {
        let mut budget = test_budget(vec![
            test_section(1, true, vec![test_item(1, 3000.0, 2900.0)]),
            test_section(2, false, vec![test_item(2, 1200.0, 1250.0)]),
            test_section(3, false, vec![test_item(3, 300.0, 0.0)]),
        ]);

        budget.recalculate_totals();

        assert_eq!(3000.0, budget.total_planned_income);
        assert_eq!(2900.0, budget.total_income);
        assert_eq!(1500.0, budget.total_planned_expenses);
        assert_eq!(1250.0, budget.total_expenses);
    }

    #[test]
    fn non_finite_amounts_contribute_zero() {
        let mut budget = test_budget(vec![test_section(
            1,
            false,
            vec![test_item(1, f64::NAN, f64::INFINITY), test_item(2, 10.0, 5.0)],
        )]);

        budget.recalculate_totals();

        assert_eq!(10.0, budget.sections[0].total_planned);
        assert_eq!(5.0, budget.sections[0].total_actual);
        assert_eq!(10.0, budget.total_planned_expenses);
    }

    #[test]
    fn zeroes_totals_when_sections_are_empty() {
        let mut budget = test_budget(vec![test_section(1, true, Vec::new())]);
        budget.total_planned_income = 999.0;

        budget.recalculate_totals();

        assert_eq!(0.0, budget.total_planned_income);
        assert_eq!(0.0, budget.sections[0].total_planned);
    }
}



#[cfg(test)]
mod mutation_tests {
    use async_trait::async_trait;

    use super::{
        Budget, BudgetController, BudgetId, BudgetItem, BudgetItemId, ItemPatch, Section,
        SectionId, SectionPatch, YearlySummary, test_budget, test_item, test_section,
    };
    use crate::{
        Error,
        clients::{BudgetClient, ItemClient, SectionClient},
    };

    /// Serves a fixed budget on fetch and canned responses for mutations.
    /// When `error` is set, every mutation fails with it.
    struct StubMutationClient {
        budget: Budget,
        section: Option<Section>,
        item: Option<BudgetItem>,
        error: Option<Error>,
    }

    impl StubMutationClient {
        fn for_budget(budget: Budget) -> Self {
            Self {
                budget,
                section: None,
                item: None,
                error: None,
            }
        }
    }

    #[async_trait]
    impl BudgetClient for StubMutationClient {
        async fn get_budget(
            &self,
            _year: i32,
            _month: u8,
            _create_if_missing: bool,
        ) -> Result<Budget, Error> {
            Ok(self.budget.clone())
        }

        async fn get_yearly_summary(&self, _year: i32) -> Result<YearlySummary, Error> {
            todo!()
        }

        async fn create_budget(&self, _year: i32, _month: u8) -> Result<Budget, Error> {
            todo!()
        }
    }

    #[async_trait]
    impl SectionClient for StubMutationClient {
        async fn create_section(
            &self,
            _budget_id: BudgetId,
            _name: &str,
            _is_income: bool,
        ) -> Result<Section, Error> {
            match &self.error {
                Some(error) => Err(error.clone()),
                None => Ok(self.section.clone().unwrap()),
            }
        }

        async fn update_section(
            &self,
            _id: SectionId,
            _patch: &SectionPatch,
        ) -> Result<Section, Error> {
            match &self.error {
                Some(error) => Err(error.clone()),
                None => Ok(self.section.clone().unwrap()),
            }
        }

        async fn delete_section(&self, _id: SectionId) -> Result<(), Error> {
            match &self.error {
                Some(error) => Err(error.clone()),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl ItemClient for StubMutationClient {
        async fn create_item(
            &self,
            _section_id: SectionId,
            _name: &str,
            _planned_amount: f64,
            _actual_amount: f64,
        ) -> Result<BudgetItem, Error> {
            match &self.error {
                Some(error) => Err(error.clone()),
                None => Ok(self.item.clone().unwrap()),
            }
        }

        async fn update_item(
            &self,
            _id: BudgetItemId,
            _patch: &ItemPatch,
        ) -> Result<BudgetItem, Error> {
            match &self.error {
                Some(error) => Err(error.clone()),
                None => Ok(self.item.clone().unwrap()),
            }
        }

        async fn delete_item(&self, _id: BudgetItemId) -> Result<(), Error> {
            match &self.error {
                Some(error) => Err(error.clone()),
                None => Ok(()),
            }
        }
    }

    async fn loaded_controller(
        client: StubMutationClient,
    ) -> BudgetController<StubMutationClient> {
        let controller = BudgetController::new(client);
        controller.fetch_budget(2025, 6).await;
        controller
    }

    #[tokio::test]
    async fn add_section_appends_server_representation() {
        let mut client = StubMutationClient::for_budget(test_budget(Vec::new()));
        client.section = Some(test_section(7, false, Vec::new()));
        let controller = loaded_controller(client).await;

        controller.add_section("Section 7", false).await;

        let budget = controller.current_budget().unwrap();
        assert_eq!(1, budget.sections.len());
        assert_eq!(Some(7), budget.sections[0].id);
    }

    #[tokio::test]
    async fn add_section_is_noop_without_a_loaded_budget() {
        let mut client = StubMutationClient::for_budget(test_budget(Vec::new()));
        client.section = Some(test_section(7, false, Vec::new()));
        let controller = BudgetController::new(client);

        controller.add_section("Section 7", false).await;

        assert_eq!(None, controller.current_budget());
        assert_eq!(None, controller.error());
    }

    #[tokio::test]
    async fn add_section_against_the_offline_budget_records_an_error() {
        let mut client = StubMutationClient::for_budget(test_budget(Vec::new()));
        client.budget.id = None;
        client.section = Some(test_section(7, false, Vec::new()));
        let controller = loaded_controller(client).await;

        controller.add_section("Section 7", false).await;

        assert!(controller.current_budget().unwrap().sections.is_empty());
        assert_eq!(Some("Failed to add section".to_string()), controller.error());
    }

    #[tokio::test]
    async fn failed_section_mutation_records_error_and_leaves_state() {
        let mut client =
            StubMutationClient::for_budget(test_budget(vec![test_section(1, false, Vec::new())]));
        client.error = Some(Error::Api {
            status: 500,
            message: Some("database unavailable".to_string()),
        });
        let controller = loaded_controller(client).await;

        controller.delete_section(1).await;

        let budget = controller.current_budget().unwrap();
        assert_eq!(1, budget.sections.len());
        assert_eq!(Some("database unavailable".to_string()), controller.error());
    }

    #[tokio::test]
    async fn update_section_replaces_by_id() {
        let mut client = StubMutationClient::for_budget(test_budget(vec![
            test_section(1, false, Vec::new()),
            test_section(2, false, Vec::new()),
        ]));
        let mut renamed = test_section(2, false, Vec::new());
        renamed.name = "Groceries".to_string();
        client.section = Some(renamed);
        let controller = loaded_controller(client).await;

        controller
            .update_section(
                2,
                &SectionPatch {
                    name: Some("Groceries".to_string()),
                    ..Default::default()
                },
            )
            .await;

        let budget = controller.current_budget().unwrap();
        assert_eq!("Section 1", budget.sections[0].name);
        assert_eq!("Groceries", budget.sections[1].name);
    }

    #[tokio::test]
    async fn delete_section_filters_by_id() {
        let client = StubMutationClient::for_budget(test_budget(vec![
            test_section(1, false, Vec::new()),
            test_section(2, false, Vec::new()),
        ]));
        let controller = loaded_controller(client).await;

        controller.delete_section(1).await;

        let budget = controller.current_budget().unwrap();
        assert_eq!(1, budget.sections.len());
        assert_eq!(Some(2), budget.sections[0].id);
    }

    #[tokio::test]
    async fn add_item_appends_and_recalculates() {
        let mut client =
            StubMutationClient::for_budget(test_budget(vec![test_section(1, false, Vec::new())]));
        client.item = Some(test_item(10, 250.0, 0.0));
        let controller = loaded_controller(client).await;

        controller.add_item(1, "Item 10", 250.0).await;

        let budget = controller.current_budget().unwrap();
        assert_eq!(1, budget.sections[0].items.len());
        assert_eq!(250.0, budget.sections[0].total_planned);
        assert_eq!(250.0, budget.total_planned_expenses);
    }

    #[tokio::test]
    async fn update_item_syncs_section_and_budget_totals() {
        let mut client = StubMutationClient::for_budget(test_budget(vec![test_section(
            1,
            false,
            vec![test_item(10, 100.0, 80.0)],
        )]));
        client.item = Some(test_item(10, 150.0, 80.0));
        let controller = loaded_controller(client).await;

        controller
            .update_item(
                1,
                10,
                &ItemPatch {
                    planned_amount: Some(150.0),
                    ..Default::default()
                },
            )
            .await;

        let budget = controller.current_budget().unwrap();
        assert_eq!(150.0, budget.sections[0].total_planned);
        assert_eq!(150.0, budget.total_planned_expenses);
        assert_eq!(80.0, budget.total_expenses);
    }

    #[tokio::test]
    async fn delete_item_removes_and_recalculates() {
        let client = StubMutationClient::for_budget(test_budget(vec![test_section(
            1,
            false,
            vec![test_item(10, 100.0, 80.0), test_item(11, 20.0, 5.0)],
        )]));
        let controller = loaded_controller(client).await;

        controller.delete_item(1, 10).await;

        let budget = controller.current_budget().unwrap();
        assert_eq!(1, budget.sections[0].items.len());
        assert_eq!(20.0, budget.sections[0].total_planned);
        assert_eq!(20.0, budget.total_planned_expenses);
        assert_eq!(5.0, budget.total_expenses);
    }

    #[tokio::test]
    async fn failed_item_mutation_keeps_items_and_totals() {
        let mut client = StubMutationClient::for_budget(test_budget(vec![test_section(
            1,
            false,
            vec![test_item(10, 100.0, 80.0)],
        )]));
        client.error = Some(Error::Transport("connection reset".to_string()));
        let controller = loaded_controller(client).await;
        controller.recalculate_totals();

        controller.delete_item(1, 10).await;

        let budget = controller.current_budget().unwrap();
        assert_eq!(1, budget.sections[0].items.len());
        assert_eq!(100.0, budget.sections[0].total_planned);
        assert_eq!(Some("connection reset".to_string()), controller.error());
    }
}
