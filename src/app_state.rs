//! The factory that wires one client into the five controllers.

use crate::{
    budget::BudgetController,
    clients::{HttpClient, ResourceClient},
    plan::PlanController,
    salary::SalaryController,
    subscription::SubscriptionController,
    transaction::TransactionController,
};

/// The application's controllers, one per entity family, all sharing one
/// resource client.
#[derive(Debug)]
pub struct AppState<C> {
    /// Monthly budgets and yearly summaries.
    pub budgets: BudgetController<C>,
    /// The paginated transaction ledger.
    pub transactions: TransactionController<C>,
    /// Monthly spending plans.
    pub plans: PlanController<C>,
    /// Salary records.
    pub salaries: SalaryController<C>,
    /// Recurring subscriptions.
    pub subscriptions: SubscriptionController<C>,
}

impl AppState<HttpClient> {
    /// Build the controllers around an HTTP client for the service at
    /// `base_url`.
    pub fn new(base_url: &str) -> Self {
        Self::with_client(HttpClient::new(base_url))
    }
}

impl<C> AppState<C>
where
    C: ResourceClient + Clone,
{
    /// Build the controllers around any resource client. Tests use this to
    /// inject stubs.
    pub fn with_client(client: C) -> Self {
        Self {
            budgets: BudgetController::new(client.clone()),
            transactions: TransactionController::new(client.clone()),
            plans: PlanController::new(client.clone()),
            salaries: SalaryController::new(client.clone()),
            subscriptions: SubscriptionController::new(client),
        }
    }
}
