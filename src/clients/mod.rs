//! The resource clients: one trait per entity family describing the calls
//! the controllers make, plus the HTTP implementation that talks to the
//! remote service.
//!
//! Controllers are generic over these traits so tests can substitute stubs
//! and alternative transports can replace [HttpClient] wholesale.

mod budget;
mod http;
mod plan;
mod salary;
mod subscription;
mod transaction;

pub use budget::{BudgetClient, ItemClient, SectionClient};
pub use http::{DEFAULT_BASE_URL, HttpClient};
pub use plan::PlanClient;
pub use salary::SalaryClient;
pub use subscription::SubscriptionClient;
pub use transaction::TransactionClient;

/// The full client surface: everything a complete application needs to talk
/// to the remote service. Implemented automatically for any type that
/// implements all the per-entity traits.
pub trait ResourceClient:
    BudgetClient
    + SectionClient
    + ItemClient
    + TransactionClient
    + PlanClient
    + SalaryClient
    + SubscriptionClient
{
}

impl<T> ResourceClient for T where
    T: BudgetClient
        + SectionClient
        + ItemClient
        + TransactionClient
        + PlanClient
        + SalaryClient
        + SubscriptionClient
{
}
