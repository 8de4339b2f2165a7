//! Monthly spending plans: itemized breakdowns attached to a budget item.
//!
//! A plan belongs to one budget item for one year/month. The controller
//! keeps the month's plan list plus a "current" focus slot for whichever
//! plan a detail view is looking at.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::{Error, amount, clients::PlanClient};

/// The ID of a [Plan] on the remote service.
pub type PlanId = i64;

/// An itemized spending plan for one budget item in one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    /// The server-side ID.
    pub id: PlanId,
    /// The budget item this plan breaks down.
    pub budget_item_id: i64,
    /// The name of that item, denormalized for display.
    #[serde(default)]
    pub budget_item_name: Option<String>,
    /// The name of the item's section, denormalized for display.
    #[serde(default)]
    pub section_name: Option<String>,
    /// The calendar year the plan covers.
    pub year: i32,
    /// The calendar month (1-12) the plan covers.
    pub month: u8,
    /// The plan's line items in display order.
    #[serde(default)]
    pub items: Vec<PlanItem>,
    /// Server-derived sum of the item amounts.
    #[serde(default, deserialize_with = "amount::lenient_f64")]
    pub total: f64,
    /// When the plan was created, as reported by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// One line of a [Plan].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanItem {
    /// The server-side ID.
    pub id: i64,
    /// The line's label.
    pub name: String,
    /// The planned amount for this line.
    #[serde(default, deserialize_with = "amount::lenient_f64")]
    pub amount: f64,
    /// Render order within the plan.
    #[serde(default)]
    pub display_order: i32,
}

/// One line of a plan update. The server replaces the plan's items with the
/// submitted list wholesale.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanItemDraft {
    /// The line's label.
    pub name: String,
    /// The planned amount for this line.
    pub amount: f64,
    /// Whether the line was seeded from a subscription rather than typed in.
    pub from_subscription: bool,
}

#[derive(Debug, Default)]
struct PlanState {
    plans: Vec<Plan>,
    current_plan: Option<Plan>,
    loading: bool,
    error: Option<String>,
    fetch_seq: u64,
}

/// Holds the month's plan list and the focused plan.
///
/// Error policy: fetches record an error and clear what they were loading;
/// create, update and delete record a message and also return the error.
#[derive(Debug)]
pub struct PlanController<C> {
    client: C,
    state: Mutex<PlanState>,
}

impl<C> PlanController<C>
where
    C: PlanClient,
{
    /// Create a controller around `client`. No request is issued until the
    /// first fetch.
    pub fn new(client: C) -> Self {
        Self {
            client,
            state: Mutex::new(PlanState::default()),
        }
    }

    /// A snapshot of the loaded plan list.
    pub fn plans(&self) -> Vec<Plan> {
        self.state.lock().unwrap().plans.clone()
    }

    /// A snapshot of the focused plan, if any.
    pub fn current_plan(&self) -> Option<Plan> {
        self.state.lock().unwrap().current_plan.clone()
    }

    /// Whether a fetch is currently in flight.
    pub fn is_loading(&self) -> bool {
        self.state.lock().unwrap().loading
    }

    /// The most recently recorded error message, if any.
    pub fn error(&self) -> Option<String> {
        self.state.lock().unwrap().error.clone()
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

    /// Fetch every plan for `year`/`month`. On failure the list is cleared
    /// and an error recorded.
    pub async fn fetch_plans(&self, year: i32, month: u8) {
        let seq = self.begin_fetch();

        let result = self.client.list_plans(year, month).await;

        let mut state = self.state.lock().unwrap();
        if seq != state.fetch_seq {
            tracing::debug!("discarding stale plan list response for {year}-{month:02}");
            return;
        }

        match result {
            Ok(plans) => state.plans = plans,
            Err(error) => {
                tracing::warn!("could not fetch plans for {year}-{month:02}: {error}");
                state.plans.clear();
                state.error = Some(error.user_message("Failed to fetch plans"));
            }
        }
        state.loading = false;
    }

    /// Fetch one plan by ID into the focus slot. On failure the slot is
    /// cleared. Returns the plan so callers can render it directly.
    pub async fn fetch_plan(&self, id: PlanId) -> Option<Plan> {
        let seq = self.begin_fetch();

        let result = self.client.get_plan(id).await;

        let mut state = self.state.lock().unwrap();
        if seq != state.fetch_seq {
            tracing::debug!("discarding stale plan response for {id}");
            return None;
        }

        let plan = match result {
            Ok(plan) => Some(plan),
            Err(error) => {
                tracing::warn!("could not fetch plan {id}: {error}");
                state.error = Some(error.user_message("Failed to fetch plan"));
                None
            }
        };
        state.current_plan = plan.clone();
        state.loading = false;
        plan
    }

    /// Fetch the plan attached to `budget_item_id` for `year`/`month` into
    /// the focus slot. `None` (and a cleared slot) when the item has no plan
    /// or the fetch failed.
    pub async fn fetch_plan_for_item(
        &self,
        budget_item_id: i64,
        year: i32,
        month: u8,
    ) -> Option<Plan> {
        let seq = self.begin_fetch();

        let result = self.client.get_plan_by_item(budget_item_id, year, month).await;

        let mut state = self.state.lock().unwrap();
        if seq != state.fetch_seq {
            tracing::debug!("discarding stale plan-by-item response for {budget_item_id}");
            return None;
        }

        let plan = match result {
            Ok(plan) => plan,
            Err(error) => {
                tracing::warn!("could not fetch plan for item {budget_item_id}: {error}");
                state.error = Some(error.user_message("Failed to fetch plan"));
                None
            }
        };
        state.current_plan = plan.clone();
        state.loading = false;
        plan
    }

    /// Create an empty plan for a budget item, append it to the list, and
    /// focus it.
    pub async fn create_plan(
        &self,
        budget_item_id: i64,
        year: i32,
        month: u8,
    ) -> Result<Plan, Error> {
        {
            let mut state = self.state.lock().unwrap();
            state.loading = true;
            state.error = None;
        }

        let result = self.client.create_plan(budget_item_id, year, month).await;

        let mut state = self.state.lock().unwrap();
        state.loading = false;
        match result {
            Ok(plan) => {
                state.plans.push(plan.clone());
                state.current_plan = Some(plan.clone());
                Ok(plan)
            }
            Err(error) => {
                drop(state);
                self.record_error(&error, "Failed to create plan");
                Err(error)
            }
        }
    }

    /// Replace a plan's items wholesale and sync the server's representation
    /// into both the list and the focus slot.
    pub async fn update_plan(&self, id: PlanId, items: &[PlanItemDraft]) -> Result<Plan, Error> {
        {
            let mut state = self.state.lock().unwrap();
            state.loading = true;
            state.error = None;
        }

        let result = self.client.update_plan(id, items).await;

        let mut state = self.state.lock().unwrap();
        state.loading = false;
        match result {
            Ok(plan) => {
                if let Some(existing) = state.plans.iter_mut().find(|plan| plan.id == id) {
                    *existing = plan.clone();
                }
                // The updated plan takes the focus slot even when another
                // plan was focused before.
                state.current_plan = Some(plan.clone());
                Ok(plan)
            }
            Err(error) => {
                drop(state);
                self.record_error(&error, "Failed to update plan");
                Err(error)
            }
        }
    }

    /// Delete a plan, drop it from the list, and clear the focus slot if it
    /// was focused.
    pub async fn delete_plan(&self, id: PlanId) -> Result<(), Error> {
        {
            let mut state = self.state.lock().unwrap();
            state.loading = true;
            state.error = None;
        }

        let result = self.client.delete_plan(id).await;

        let mut state = self.state.lock().unwrap();
        state.loading = false;
        match result {
            Ok(()) => {
                state.plans.retain(|plan| plan.id != id);
                if state
                    .current_plan
                    .as_ref()
                    .is_some_and(|current| current.id == id)
                {
                    state.current_plan = None;
                }
                Ok(())
            }
            Err(error) => {
                drop(state);
                self.record_error(&error, "Failed to delete plan");
                Err(error)
            }
        }
    }

    /// Drop the focus slot without touching the list.
    pub fn clear_current_plan(&self) {
        self.state.lock().unwrap().current_plan = None;
    }
}

#[cfg(test)]
fn test_plan(id: PlanId, budget_item_id: i64) -> Plan {
    Plan {
        id,
        budget_item_id,
        budget_item_name: None,
        section_name: None,
        year: 2025,
        month: 6,
        items: Vec::new(),
        total: 0.0,
        created_at: None,
    }
}

#[cfg(test)]
mod controller_tests {
    use async_trait::async_trait;

    use super::{Plan, PlanController, PlanId, PlanItem, PlanItemDraft, test_plan};
    use crate::{Error, clients::PlanClient};

    struct StubPlanClient {
        plans: Result<Vec<Plan>, Error>,
        plan: Result<Plan, Error>,
        by_item: Result<Option<Plan>, Error>,
        error: Option<Error>,
    }

    impl Default for StubPlanClient {
        fn default() -> Self {
            Self {
                plans: Ok(Vec::new()),
                plan: Ok(test_plan(1, 10)),
                by_item: Ok(None),
                error: None,
            }
        }
    }

    #[async_trait]
    impl PlanClient for StubPlanClient {
        async fn list_plans(&self, _year: i32, _month: u8) -> Result<Vec<Plan>, Error> {
            self.plans.clone()
        }

        async fn get_plan(&self, _id: PlanId) -> Result<Plan, Error> {
            self.plan.clone()
        }

        async fn get_plan_by_item(
            &self,
            _budget_item_id: i64,
            _year: i32,
            _month: u8,
        ) -> Result<Option<Plan>, Error> {
            self.by_item.clone()
        }

        async fn create_plan(
            &self,
            budget_item_id: i64,
            _year: i32,
            _month: u8,
        ) -> Result<Plan, Error> {
            match &self.error {
                Some(error) => Err(error.clone()),
                None => Ok(test_plan(99, budget_item_id)),
            }
        }

        async fn update_plan(
            &self,
            id: PlanId,
            items: &[PlanItemDraft],
        ) -> Result<Plan, Error> {
            match &self.error {
                Some(error) => Err(error.clone()),
                None => {
                    let mut plan = test_plan(id, 10);
                    plan.items = items
                        .iter()
                        .enumerate()
                        .map(|(index, draft)| PlanItem {
                            id: index as i64 + 1,
                            name: draft.name.clone(),
                            amount: draft.amount,
                            display_order: index as i32,
                        })
                        .collect();
                    plan.total = items.iter().map(|draft| draft.amount).sum();
                    Ok(plan)
                }
            }
        }

        async fn delete_plan(&self, _id: PlanId) -> Result<(), Error> {
            match &self.error {
                Some(error) => Err(error.clone()),
                None => Ok(()),
            }
        }
    }

    #[tokio::test]
    async fn fetch_plans_replaces_the_list() {
        let controller = PlanController::new(StubPlanClient {
            plans: Ok(vec![test_plan(1, 10), test_plan(2, 11)]),
            ..Default::default()
        });

        controller.fetch_plans(2025, 6).await;

        assert_eq!(2, controller.plans().len());
        assert_eq!(None, controller.error());
        assert!(!controller.is_loading());
    }

    #[tokio::test]
    async fn failed_fetch_clears_the_list() {
        let controller = PlanController::new(StubPlanClient {
            plans: Err(Error::InvalidResponse("expected a list".to_string())),
            ..Default::default()
        });

        controller.fetch_plans(2025, 6).await;

        assert!(controller.plans().is_empty());
        assert_eq!(Some("Failed to fetch plans".to_string()), controller.error());
    }

    #[tokio::test]
    async fn fetch_plan_focuses_and_returns_it() {
        let controller = PlanController::new(StubPlanClient::default());

        let got = controller.fetch_plan(1).await;

        assert_eq!(Some(test_plan(1, 10)), got);
        assert_eq!(Some(test_plan(1, 10)), controller.current_plan());
    }

    #[tokio::test]
    async fn fetch_plan_failure_clears_the_focus_slot() {
        let controller = PlanController::new(StubPlanClient {
            plan: Err(Error::Transport("connection refused".to_string())),
            ..Default::default()
        });
        controller.create_plan(1, 2025, 6).await.ok();

        let got = controller.fetch_plan(1).await;

        assert_eq!(None, got);
        assert_eq!(None, controller.current_plan());
        assert_eq!(Some("connection refused".to_string()), controller.error());
    }

    #[tokio::test]
    async fn fetch_plan_for_item_handles_a_missing_plan() {
        let controller = PlanController::new(StubPlanClient {
            by_item: Ok(None),
            ..Default::default()
        });

        let got = controller.fetch_plan_for_item(10, 2025, 6).await;

        assert_eq!(None, got);
        assert_eq!(None, controller.current_plan());
        assert_eq!(None, controller.error());
    }

    #[tokio::test]
    async fn create_plan_appends_and_focuses() {
        let controller = PlanController::new(StubPlanClient::default());

        let created = controller.create_plan(10, 2025, 6).await.unwrap();

        assert_eq!(99, created.id);
        assert_eq!(1, controller.plans().len());
        assert_eq!(Some(created), controller.current_plan());
        assert!(!controller.is_loading());
    }

    #[tokio::test]
    async fn failed_create_records_payload_message_and_propagates() {
        let controller = PlanController::new(StubPlanClient {
            error: Some(Error::Api {
                status: 409,
                message: Some("Plan already exists for this item".to_string()),
            }),
            ..Default::default()
        });

        let got = controller.create_plan(10, 2025, 6).await;

        assert!(got.is_err());
        assert!(controller.plans().is_empty());
        assert_eq!(
            Some("Plan already exists for this item".to_string()),
            controller.error()
        );
    }

    #[tokio::test]
    async fn update_plan_syncs_list_and_focus_slot() {
        let controller = PlanController::new(StubPlanClient {
            plans: Ok(vec![test_plan(1, 10)]),
            ..Default::default()
        });
        controller.fetch_plans(2025, 6).await;
        controller.fetch_plan(1).await;

        let items = vec![
            PlanItemDraft {
                name: "Groceries".to_string(),
                amount: 120.0,
                from_subscription: false,
            },
            PlanItemDraft {
                name: "Streaming".to_string(),
                amount: 15.0,
                from_subscription: true,
            },
        ];
        let updated = controller.update_plan(1, &items).await.unwrap();

        assert_eq!(135.0, updated.total);
        assert_eq!(2, controller.plans()[0].items.len());
        assert_eq!(135.0, controller.current_plan().unwrap().total);
    }

    #[tokio::test]
    async fn update_plan_refocuses_even_when_another_plan_was_focused() {
        let controller = PlanController::new(StubPlanClient {
            plans: Ok(vec![test_plan(1, 10), test_plan(2, 11)]),
            plan: Ok(test_plan(2, 11)),
            ..Default::default()
        });
        controller.fetch_plans(2025, 6).await;
        controller.fetch_plan(2).await;

        let items = vec![PlanItemDraft {
            name: "Groceries".to_string(),
            amount: 120.0,
            from_subscription: false,
        }];
        controller.update_plan(1, &items).await.unwrap();

        assert_eq!(Some(1), controller.current_plan().map(|plan| plan.id));
        assert_eq!(120.0, controller.plans()[0].total);
    }

    #[tokio::test]
    async fn delete_plan_removes_and_unfocuses() {
        let controller = PlanController::new(StubPlanClient {
            plans: Ok(vec![test_plan(1, 10), test_plan(2, 11)]),
            ..Default::default()
        });
        controller.fetch_plans(2025, 6).await;
        controller.fetch_plan(1).await;

        controller.delete_plan(1).await.unwrap();

        assert_eq!(1, controller.plans().len());
        assert_eq!(2, controller.plans()[0].id);
        assert_eq!(None, controller.current_plan());
    }

    #[tokio::test]
    async fn delete_plan_keeps_an_unrelated_focus() {
        let controller = PlanController::new(StubPlanClient {
            plans: Ok(vec![test_plan(1, 10), test_plan(2, 11)]),
            ..Default::default()
        });
        controller.fetch_plans(2025, 6).await;
        controller.fetch_plan(1).await;

        controller.delete_plan(2).await.unwrap();

        assert_eq!(Some(1), controller.current_plan().map(|plan| plan.id));
    }

    #[tokio::test]
    async fn clear_current_plan_only_drops_the_focus() {
        let controller = PlanController::new(StubPlanClient {
            plans: Ok(vec![test_plan(1, 10)]),
            ..Default::default()
        });
        controller.fetch_plans(2025, 6).await;
        controller.fetch_plan(1).await;

        controller.clear_current_plan();

        assert_eq!(None, controller.current_plan());
        assert_eq!(1, controller.plans().len());
    }
}
