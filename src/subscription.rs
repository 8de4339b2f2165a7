//! Recurring subscriptions: named charges with a billing day and recurrence
//! that can seed plan lines.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::{Error, amount, clients::SubscriptionClient};

/// The ID of a [Subscription] on the remote service.
pub type SubscriptionId = i64;

/// How often a subscription bills.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecurrenceType {
    /// Bills every week.
    Weekly,
    /// Bills once a month, on the billing day.
    #[default]
    Monthly,
    /// Bills once a year.
    Yearly,
}

/// One recurring charge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    /// The server-side ID.
    pub id: SubscriptionId,
    /// The subscription name, e.g. "Streaming service".
    pub name: String,
    /// The amount charged per billing cycle.
    #[serde(default, deserialize_with = "amount::lenient_f64")]
    pub amount: f64,
    /// The day of the month (1-31) the charge lands.
    #[serde(default)]
    pub billing_day: Option<u8>,
    /// A free-form category label.
    #[serde(default)]
    pub category: Option<String>,
    /// The billing cadence.
    #[serde(default)]
    pub recurrence: RecurrenceType,
    /// Whether the subscription is still active.
    #[serde(default)]
    pub is_active: bool,
    /// When the record was created, as reported by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// The fields for creating or replacing a subscription.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionDraft {
    /// The subscription name.
    pub name: String,
    /// The amount charged per billing cycle.
    pub amount: f64,
    /// The day of the month (1-31) the charge lands.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_day: Option<u8>,
    /// A free-form category label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// The billing cadence.
    pub recurrence: RecurrenceType,
    /// Whether the subscription is active.
    pub is_active: bool,
}

#[derive(Debug, Default)]
struct SubscriptionState {
    subscriptions: Vec<Subscription>,
    loading: bool,
    error: Option<String>,
    fetch_seq: u64,
}

/// Holds the subscription list.
///
/// Error policy: fetches record an error and clear the list; create, update
/// and delete record a message and also return the error.
#[derive(Debug)]
pub struct SubscriptionController<C> {
    client: C,
    state: Mutex<SubscriptionState>,
}

impl<C> SubscriptionController<C>
where
    C: SubscriptionClient,
{
    /// Create a controller around `client`. No request is issued until the
    /// first fetch.
    pub fn new(client: C) -> Self {
        Self {
            client,
            state: Mutex::new(SubscriptionState::default()),
        }
    }

    /// A snapshot of the loaded subscription list.
    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.state.lock().unwrap().subscriptions.clone()
    }

    /// Whether a fetch is currently in flight.
    pub fn is_loading(&self) -> bool {
        self.state.lock().unwrap().loading
    }

    /// The most recently recorded error message, if any.
    pub fn error(&self) -> Option<String> {
        self.state.lock().unwrap().error.clone()
    }

    fn record_error(&self, error: &Error, fallback: &str) {
        tracing::error!("{fallback}: {error}");
        self.state.lock().unwrap().error = Some(error.user_message(fallback));
    }

    /// Fetch every subscription. On failure the list is cleared and an
    /// error recorded.
    pub async fn fetch_subscriptions(&self) {
        let seq = {
            let mut state = self.state.lock().unwrap();
            state.loading = true;
            state.error = None;
            state.fetch_seq += 1;
            state.fetch_seq
        };

        let result = self.client.list_subscriptions().await;

        let mut state = self.state.lock().unwrap();
        if seq != state.fetch_seq {
            tracing::debug!("discarding stale subscription list response");
            return;
        }

        match result {
            Ok(subscriptions) => state.subscriptions = subscriptions,
            Err(error) => {
                tracing::warn!("could not fetch subscriptions: {error}");
                state.subscriptions.clear();
                state.error = Some(error.user_message("Failed to fetch subscriptions"));
            }
        }
        state.loading = false;
    }

    /// Create a subscription and append the server's representation.
    pub async fn create_subscription(
        &self,
        draft: &SubscriptionDraft,
    ) -> Result<Subscription, Error> {
        {
            let mut state = self.state.lock().unwrap();
            state.loading = true;
            state.error = None;
        }

        let result = self.client.create_subscription(draft).await;

        let mut state = self.state.lock().unwrap();
        state.loading = false;
        match result {
            Ok(subscription) => {
                state.subscriptions.push(subscription.clone());
                Ok(subscription)
            }
            Err(error) => {
                drop(state);
                self.record_error(&error, "Failed to create subscription");
                Err(error)
            }
        }
    }

    /// Replace a subscription and sync the server's representation into the
    /// list.
    pub async fn update_subscription(
        &self,
        id: SubscriptionId,
        draft: &SubscriptionDraft,
    ) -> Result<Subscription, Error> {
        {
            let mut state = self.state.lock().unwrap();
            state.loading = true;
            state.error = None;
        }

        let result = self.client.update_subscription(id, draft).await;

        let mut state = self.state.lock().unwrap();
        state.loading = false;
        match result {
            Ok(subscription) => {
                if let Some(existing) = state
                    .subscriptions
                    .iter_mut()
                    .find(|subscription| subscription.id == id)
                {
                    *existing = subscription.clone();
                }
                Ok(subscription)
            }
            Err(error) => {
                drop(state);
                self.record_error(&error, "Failed to update subscription");
                Err(error)
            }
        }
    }

    /// Delete a subscription and drop it from the list.
    pub async fn delete_subscription(&self, id: SubscriptionId) -> Result<(), Error> {
        {
            let mut state = self.state.lock().unwrap();
            state.loading = true;
            state.error = None;
        }

        let result = self.client.delete_subscription(id).await;

        let mut state = self.state.lock().unwrap();
        state.loading = false;
        match result {
            Ok(()) => {
                state.subscriptions.retain(|subscription| subscription.id != id);
                Ok(())
            }
            Err(error) => {
                drop(state);
                self.record_error(&error, "Failed to delete subscription");
                Err(error)
            }
        }
    }
}

#[cfg(test)]
fn test_subscription(id: SubscriptionId, name: &str, amount: f64) -> Subscription {
    Subscription {
        id,
        name: name.to_string(),
        amount,
        billing_day: Some(1),
        category: None,
        recurrence: RecurrenceType::Monthly,
        is_active: true,
        created_at: None,
    }
}
