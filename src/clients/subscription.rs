//! The client calls behind the subscription controller.

use async_trait::async_trait;

use crate::{
    Error,
    subscription::{Subscription, SubscriptionDraft, SubscriptionId},
};

/// Remote access to recurring subscriptions.
#[async_trait]
pub trait SubscriptionClient: Send + Sync {
    /// Fetch every subscription.
    async fn list_subscriptions(&self) -> Result<Vec<Subscription>, Error>;

    /// Fetch a single subscription by ID.
    async fn get_subscription(&self, id: SubscriptionId) -> Result<Subscription, Error>;

    /// Create a subscription.
    async fn create_subscription(&self, draft: &SubscriptionDraft)
    -> Result<Subscription, Error>;

    /// Replace a subscription's fields.
    async fn update_subscription(
        &self,
        id: SubscriptionId,
        draft: &SubscriptionDraft,
    ) -> Result<Subscription, Error>;

    /// Delete a subscription.
    async fn delete_subscription(&self, id: SubscriptionId) -> Result<(), Error>;
}
