//! Salary records: per-paycheck gross pay, withholdings, and the derived
//! net pay the server computes.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::{Error, amount, clients::SalaryClient};

/// The ID of a [Salary] on the remote service.
pub type SalaryId = i64;

/// One salary configuration. All amounts are per pay period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Salary {
    /// The server-side ID.
    pub id: SalaryId,
    /// A label for this configuration, e.g. an employer name.
    pub name: String,
    /// Gross pay per period.
    #[serde(default, deserialize_with = "amount::lenient_f64")]
    pub regular_amount: f64,
    /// Federal income tax withheld.
    #[serde(default, deserialize_with = "amount::lenient_f64")]
    pub federal_tax: f64,
    /// Medicare withheld.
    #[serde(default, deserialize_with = "amount::lenient_f64")]
    pub medicare: f64,
    /// Social Security withheld.
    #[serde(default, deserialize_with = "amount::lenient_f64")]
    pub social_security: f64,
    /// 401(k) contribution.
    #[serde(default, rename = "fourOhOneK", deserialize_with = "amount::lenient_f64")]
    pub four_oh_one_k: f64,
    /// Additional voluntary withholding.
    #[serde(default, deserialize_with = "amount::lenient_f64")]
    pub extra_tax_withholding: f64,
    /// HSA contribution.
    #[serde(default, deserialize_with = "amount::lenient_f64")]
    pub health_savings_account: f64,
    /// Medical insurance premium.
    #[serde(default, deserialize_with = "amount::lenient_f64")]
    pub medical_insurance: f64,
    /// FSA contribution.
    #[serde(default, deserialize_with = "amount::lenient_f64")]
    pub flexible_spending_account: f64,
    /// Server-derived take-home pay after all deductions.
    #[serde(default, deserialize_with = "amount::lenient_f64")]
    pub net_pay: f64,
    /// Whether this is the active configuration.
    #[serde(default)]
    pub is_active: bool,
    /// When the record was created, as reported by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// The fields for creating or replacing a salary record. Net pay and the
/// active flag are server-managed and not submitted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryDraft {
    /// A label for this configuration.
    pub name: String,
    /// Gross pay per period.
    pub regular_amount: f64,
    /// Federal income tax withheld.
    pub federal_tax: f64,
    /// Medicare withheld.
    pub medicare: f64,
    /// Social Security withheld.
    pub social_security: f64,
    /// 401(k) contribution.
    #[serde(rename = "fourOhOneK")]
    pub four_oh_one_k: f64,
    /// Additional voluntary withholding.
    pub extra_tax_withholding: f64,
    /// HSA contribution.
    pub health_savings_account: f64,
    /// Medical insurance premium.
    pub medical_insurance: f64,
    /// FSA contribution.
    pub flexible_spending_account: f64,
}

#[derive(Debug, Default)]
struct SalaryState {
    salaries: Vec<Salary>,
    loading: bool,
    error: Option<String>,
    fetch_seq: u64,
}

/// Holds the salary record list.
///
/// Error policy: fetches record an error and clear the list; create, update
/// and delete record a message and also return the error.
#[derive(Debug)]
pub struct SalaryController<C> {
    client: C,
    state: Mutex<SalaryState>,
}

impl<C> SalaryController<C>
where
    C: SalaryClient,
{
    /// Create a controller around `client`. No request is issued until the
    /// first fetch.
    pub fn new(client: C) -> Self {
        Self {
            client,
            state: Mutex::new(SalaryState::default()),
        }
    }

    /// A snapshot of the loaded salary list.
    pub fn salaries(&self) -> Vec<Salary> {
        self.state.lock().unwrap().salaries.clone()
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

    /// Fetch every salary record. On failure the list is cleared and an
    /// error recorded.
    pub async fn fetch_salaries(&self) {
        let seq = {
            let mut state = self.state.lock().unwrap();
            state.loading = true;
            state.error = None;
            state.fetch_seq += 1;
            state.fetch_seq
        };

        let result = self.client.list_salaries().await;

        let mut state = self.state.lock().unwrap();
        if seq != state.fetch_seq {
            tracing::debug!("discarding stale salary list response");
            return;
        }

        match result {
            Ok(salaries) => state.salaries = salaries,
            Err(error) => {
                tracing::warn!("could not fetch salaries: {error}");
                state.salaries.clear();
                state.error = Some(error.user_message("Failed to fetch salaries"));
            }
        }
        state.loading = false;
    }

    /// Create a salary record and append the server's representation, which
    /// carries the derived net pay.
    pub async fn create_salary(&self, draft: &SalaryDraft) -> Result<Salary, Error> {
        {
            let mut state = self.state.lock().unwrap();
            state.loading = true;
            state.error = None;
        }

        let result = self.client.create_salary(draft).await;

        let mut state = self.state.lock().unwrap();
        state.loading = false;
        match result {
            Ok(salary) => {
                state.salaries.push(salary.clone());
                Ok(salary)
            }
            Err(error) => {
                drop(state);
                self.record_error(&error, "Failed to create salary");
                Err(error)
            }
        }
    }

    /// Replace a salary record and sync the server's representation into
    /// the list.
    pub async fn update_salary(&self, id: SalaryId, draft: &SalaryDraft) -> Result<Salary, Error> {
        {
            let mut state = self.state.lock().unwrap();
            state.loading = true;
            state.error = None;
        }

        let result = self.client.update_salary(id, draft).await;

        let mut state = self.state.lock().unwrap();
        state.loading = false;
        match result {
            Ok(salary) => {
                if let Some(existing) = state.salaries.iter_mut().find(|salary| salary.id == id) {
                    *existing = salary.clone();
                }
                Ok(salary)
            }
            Err(error) => {
                drop(state);
                self.record_error(&error, "Failed to update salary");
                Err(error)
            }
        }
    }

    /// Delete a salary record and drop it from the list.
    pub async fn delete_salary(&self, id: SalaryId) -> Result<(), Error> {
        {
            let mut state = self.state.lock().unwrap();
            state.loading = true;
            state.error = None;
        }

        let result = self.client.delete_salary(id).await;

        let mut state = self.state.lock().unwrap();
        state.loading = false;
        match result {
            Ok(()) => {
                state.salaries.retain(|salary| salary.id != id);
                Ok(())
            }
            Err(error) => {
                drop(state);
                self.record_error(&error, "Failed to delete salary");
                Err(error)
            }
        }
    }
}

#[cfg(test)]
fn test_salary(id: SalaryId, regular_amount: f64, net_pay: f64) -> Salary {
    Salary {
        id,
        name: format!("Salary {id}"),
        regular_amount,
        federal_tax: 0.0,
        medicare: 0.0,
        social_security: 0.0,
        four_oh_one_k: 0.0,
        extra_tax_withholding: 0.0,
        health_savings_account: 0.0,
        medical_insurance: 0.0,
        flexible_spending_account: 0.0,
        net_pay,
        is_active: true,
        created_at: None,
    }
}
