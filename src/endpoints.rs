//! The remote service's endpoint URIs, relative to the API base URL.
//!
//! For endpoints that take a parameter, e.g., '/sections/{section_id}', use
//! [format_endpoint].

/// The route to fetch or create monthly budgets.
pub const BUDGETS: &str = "/budgets";
/// The route to create a section within a budget.
pub const SECTIONS: &str = "/sections";
/// The route to update or delete a section.
pub const SECTION: &str = "/sections/{section_id}";
/// The route to create a budget item within a section.
pub const ITEMS: &str = "/items";
/// The route to update or delete a budget item.
pub const ITEM: &str = "/items/{item_id}";
/// The route to list or create transactions.
pub const TRANSACTIONS: &str = "/transactions";
/// The route to fetch, update or delete a single transaction.
pub const TRANSACTION: &str = "/transactions/{transaction_id}";
/// The route to bulk import transactions.
pub const TRANSACTION_IMPORT: &str = "/transactions/import";
/// The route to list or create monthly spending plans.
pub const PLANS: &str = "/plans";
/// The route to fetch, update or delete a single plan.
pub const PLAN: &str = "/plans/{plan_id}";
/// The route to look a plan up by its budget item and period.
pub const PLAN_BY_ITEM: &str = "/plans/by-item";
/// The route to list or create salary records.
pub const SALARIES: &str = "/salaries";
/// The route to fetch, update or delete a single salary record.
pub const SALARY: &str = "/salaries/{salary_id}";
/// The route to list or create subscriptions.
pub const SUBSCRIPTIONS: &str = "/subscriptions";
/// The route to fetch, update or delete a single subscription.
pub const SUBSCRIPTION: &str = "/subscriptions/{subscription_id}";

/// Replace the first `{...}` parameter in `endpoint_path` with `id`.
///
/// Returns the path unchanged if it has no parameter.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let mut param_start = None;
    let mut param_end = None;

    for (i, c) in endpoint_path.chars().enumerate() {
        if c == '{' {
            param_start = Some(i);
        } else if param_start.is_some() && c == '}' {
            param_end = Some(i + 1);
            break;
        }
    }

    let param_start = match param_start {
        Some(start) => start,
        None => return endpoint_path.to_string(),
    };

    let param_end = param_end.unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
