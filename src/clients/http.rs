//! The HTTP implementation of the resource clients.
//!
//! Requests and responses are JSON. Error responses are expected to carry a
//! structured payload with an "error" or "message" key; when they do, that
//! message is surfaced through [Error::Api].

use async_trait::async_trait;
use hyper::{Body, Method, Request, StatusCode, client::HttpConnector, header};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    Error, endpoints,
    budget::{
        Budget, BudgetId, BudgetItem, BudgetItemId, ItemPatch, Section, SectionId, SectionPatch,
        YearlySummary,
    },
    plan::{Plan, PlanId, PlanItemDraft},
    salary::{Salary, SalaryDraft, SalaryId},
    subscription::{Subscription, SubscriptionDraft, SubscriptionId},
    transaction::{
        CsvImport, Page, Transaction, TransactionDraft, TransactionId, TransactionPatch,
        TransactionQuery,
    },
};

use super::{
    BudgetClient, ItemClient, PlanClient, SalaryClient, SectionClient, SubscriptionClient,
    TransactionClient,
};

/// Where the remote service listens when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";

/// A JSON-over-HTTP client for the remote budget service.
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: hyper::Client<HttpConnector>,
    base_url: String,
}

impl HttpClient {
    /// Create a client for the service at `base_url` (scheme, host, port and
    /// path prefix, e.g. "http://localhost:8080/api").
    pub fn new(base_url: &str) -> Self {
        Self {
            http: hyper::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn send(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<Vec<u8>>,
    ) -> Result<(StatusCode, Vec<u8>), Error> {
        let uri = format!("{}{}", self.base_url, path_and_query);
        tracing::debug!("{method} {uri}");

        let mut builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(bytes) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                builder.body(Body::from(bytes))
            }
            None => builder.body(Body::empty()),
        }
        .map_err(|e| Error::InvalidRequest(e.to_string()))?;

        let response = self
            .http
            .request(request)
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body())
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        Ok((status, bytes.to_vec()))
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<Vec<u8>>,
    ) -> Result<T, Error> {
        let (status, bytes) = self.send(method, path_and_query, body).await?;

        if !status.is_success() {
            return Err(error_from_response(status, &bytes));
        }

        serde_json::from_slice(&bytes).map_err(|e| Error::InvalidResponse(e.to_string()))
    }

    async fn request_empty(
        &self,
        method: Method,
        path_and_query: &str,
    ) -> Result<(), Error> {
        let (status, bytes) = self.send(method, path_and_query, None).await?;

        if !status.is_success() {
            return Err(error_from_response(status, &bytes));
        }

        Ok(())
    }
}

fn encode<B: Serialize>(body: &B) -> Result<Vec<u8>, Error> {
    serde_json::to_vec(body).map_err(|e| Error::InvalidRequest(e.to_string()))
}

/// Turn a non-success response into [Error::Api], pulling the message out of
/// the structured payload's "error" or "message" key when one is present.
fn error_from_response(status: StatusCode, body: &[u8]) -> Error {
    let message = serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|payload| {
            payload
                .get("error")
                .or_else(|| payload.get("message"))
                .and_then(|value| value.as_str())
                .map(str::to_string)
        });

    Error::Api {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl BudgetClient for HttpClient {
    async fn get_budget(
        &self,
        year: i32,
        month: u8,
        create_if_missing: bool,
    ) -> Result<Budget, Error> {
        let path = format!(
            "{}/{year}/{month}?createIfMissing={create_if_missing}",
            endpoints::BUDGETS
        );
        self.request_json(Method::GET, &path, None).await
    }

    async fn get_yearly_summary(&self, year: i32) -> Result<YearlySummary, Error> {
        let path = format!("{}/{year}", endpoints::BUDGETS);
        self.request_json(Method::GET, &path, None).await
    }

    async fn create_budget(&self, year: i32, month: u8) -> Result<Budget, Error> {
        let path = format!("{}?year={year}&month={month}", endpoints::BUDGETS);
        self.request_json(Method::POST, &path, None).await
    }
}

#[async_trait]
impl SectionClient for HttpClient {
    async fn create_section(
        &self,
        budget_id: BudgetId,
        name: &str,
        is_income: bool,
    ) -> Result<Section, Error> {
        let body = encode(&serde_json::json!({
            "budgetId": budget_id,
            "name": name,
            "isIncome": is_income,
        }))?;
        self.request_json(Method::POST, endpoints::SECTIONS, Some(body))
            .await
    }

    async fn update_section(
        &self,
        id: SectionId,
        patch: &SectionPatch,
    ) -> Result<Section, Error> {
        let path = endpoints::format_endpoint(endpoints::SECTION, id);
        self.request_json(Method::PUT, &path, Some(encode(patch)?))
            .await
    }

    async fn delete_section(&self, id: SectionId) -> Result<(), Error> {
        let path = endpoints::format_endpoint(endpoints::SECTION, id);
        self.request_empty(Method::DELETE, &path).await
    }
}

#[async_trait]
impl ItemClient for HttpClient {
    async fn create_item(
        &self,
        section_id: SectionId,
        name: &str,
        planned_amount: f64,
        actual_amount: f64,
    ) -> Result<BudgetItem, Error> {
        let body = encode(&serde_json::json!({
            "sectionId": section_id,
            "name": name,
            "plannedAmount": planned_amount,
            "actualAmount": actual_amount,
        }))?;
        self.request_json(Method::POST, endpoints::ITEMS, Some(body))
            .await
    }

    async fn update_item(&self, id: BudgetItemId, patch: &ItemPatch) -> Result<BudgetItem, Error> {
        let path = endpoints::format_endpoint(endpoints::ITEM, id);
        self.request_json(Method::PUT, &path, Some(encode(patch)?))
            .await
    }

    async fn delete_item(&self, id: BudgetItemId) -> Result<(), Error> {
        let path = endpoints::format_endpoint(endpoints::ITEM, id);
        self.request_empty(Method::DELETE, &path).await
    }
}

#[async_trait]
impl TransactionClient for HttpClient {
    async fn list_transactions(
        &self,
        query: &TransactionQuery,
    ) -> Result<Page<Transaction>, Error> {
        let path = format!("{}?{}", endpoints::TRANSACTIONS, query.to_query_string()?);
        self.request_json(Method::GET, &path, None).await
    }

    async fn get_transaction(&self, id: TransactionId) -> Result<Transaction, Error> {
        let path = endpoints::format_endpoint(endpoints::TRANSACTION, id);
        self.request_json(Method::GET, &path, None).await
    }

    async fn create_transaction(&self, draft: &TransactionDraft) -> Result<Transaction, Error> {
        self.request_json(Method::POST, endpoints::TRANSACTIONS, Some(encode(draft)?))
            .await
    }

    async fn update_transaction(
        &self,
        id: TransactionId,
        patch: &TransactionPatch,
    ) -> Result<Transaction, Error> {
        let path = endpoints::format_endpoint(endpoints::TRANSACTION, id);
        self.request_json(Method::PUT, &path, Some(encode(patch)?))
            .await
    }

    async fn delete_transaction(&self, id: TransactionId) -> Result<(), Error> {
        let path = endpoints::format_endpoint(endpoints::TRANSACTION, id);
        self.request_empty(Method::DELETE, &path).await
    }

    async fn import_transactions(&self, import: &CsvImport) -> Result<Vec<Transaction>, Error> {
        self.request_json(
            Method::POST,
            endpoints::TRANSACTION_IMPORT,
            Some(encode(import)?),
        )
        .await
    }
}

#[async_trait]
impl PlanClient for HttpClient {
    async fn list_plans(&self, year: i32, month: u8) -> Result<Vec<Plan>, Error> {
        let path = format!("{}?year={year}&month={month}", endpoints::PLANS);
        self.request_json(Method::GET, &path, None).await
    }

    async fn get_plan(&self, id: PlanId) -> Result<Plan, Error> {
        let path = endpoints::format_endpoint(endpoints::PLAN, id);
        self.request_json(Method::GET, &path, None).await
    }

    async fn get_plan_by_item(
        &self,
        budget_item_id: i64,
        year: i32,
        month: u8,
    ) -> Result<Option<Plan>, Error> {
        let path = format!(
            "{}?budgetItemId={budget_item_id}&year={year}&month={month}",
            endpoints::PLAN_BY_ITEM
        );
        let (status, bytes) = self.send(Method::GET, &path, None).await?;

        // A budget item without a plan is not an error.
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(error_from_response(status, &bytes));
        }
        if bytes.is_empty() || bytes == b"null" {
            return Ok(None);
        }

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| Error::InvalidResponse(e.to_string()))
    }

    async fn create_plan(
        &self,
        budget_item_id: i64,
        year: i32,
        month: u8,
    ) -> Result<Plan, Error> {
        let body = encode(&serde_json::json!({
            "budgetItemId": budget_item_id,
            "year": year,
            "month": month,
        }))?;
        self.request_json(Method::POST, endpoints::PLANS, Some(body))
            .await
    }

    async fn update_plan(&self, id: PlanId, items: &[PlanItemDraft]) -> Result<Plan, Error> {
        let path = endpoints::format_endpoint(endpoints::PLAN, id);
        let body = encode(&serde_json::json!({ "items": items }))?;
        self.request_json(Method::PUT, &path, Some(body)).await
    }

    async fn delete_plan(&self, id: PlanId) -> Result<(), Error> {
        let path = endpoints::format_endpoint(endpoints::PLAN, id);
        self.request_empty(Method::DELETE, &path).await
    }
}

#[async_trait]
impl SalaryClient for HttpClient {
    async fn list_salaries(&self) -> Result<Vec<Salary>, Error> {
        self.request_json(Method::GET, endpoints::SALARIES, None)
            .await
    }

    async fn get_salary(&self, id: SalaryId) -> Result<Salary, Error> {
        let path = endpoints::format_endpoint(endpoints::SALARY, id);
        self.request_json(Method::GET, &path, None).await
    }

    async fn create_salary(&self, draft: &SalaryDraft) -> Result<Salary, Error> {
        self.request_json(Method::POST, endpoints::SALARIES, Some(encode(draft)?))
            .await
    }

    async fn update_salary(&self, id: SalaryId, draft: &SalaryDraft) -> Result<Salary, Error> {
        let path = endpoints::format_endpoint(endpoints::SALARY, id);
        self.request_json(Method::PUT, &path, Some(encode(draft)?))
            .await
    }

    async fn delete_salary(&self, id: SalaryId) -> Result<(), Error> {
        let path = endpoints::format_endpoint(endpoints::SALARY, id);
        self.request_empty(Method::DELETE, &path).await
    }
}

#[async_trait]
impl SubscriptionClient for HttpClient {
    async fn list_subscriptions(&self) -> Result<Vec<Subscription>, Error> {
        self.request_json(Method::GET, endpoints::SUBSCRIPTIONS, None)
            .await
    }

    async fn get_subscription(&self, id: SubscriptionId) -> Result<Subscription, Error> {
        let path = endpoints::format_endpoint(endpoints::SUBSCRIPTION, id);
        self.request_json(Method::GET, &path, None).await
    }

    async fn create_subscription(
        &self,
        draft: &SubscriptionDraft,
    ) -> Result<Subscription, Error> {
        self.request_json(Method::POST, endpoints::SUBSCRIPTIONS, Some(encode(draft)?))
            .await
    }

    async fn update_subscription(
        &self,
        id: SubscriptionId,
        draft: &SubscriptionDraft,
    ) -> Result<Subscription, Error> {
        let path = endpoints::format_endpoint(endpoints::SUBSCRIPTION, id);
        self.request_json(Method::PUT, &path, Some(encode(draft)?))
            .await
    }

    async fn delete_subscription(&self, id: SubscriptionId) -> Result<(), Error> {
        let path = endpoints::format_endpoint(endpoints::SUBSCRIPTION, id);
        self.request_empty(Method::DELETE, &path).await
    }
}

#[cfg(test)]
mod error_from_response_tests {
    use hyper::StatusCode;

    use super::error_from_response;
    use crate::Error;

    #[test]
    fn extracts_the_error_key() {
        let got = error_from_response(
            StatusCode::BAD_REQUEST,
            br#"{"error": "Amount must be positive"}"#,
        );

        assert_eq!(
            Error::Api {
                status: 400,
                message: Some("Amount must be positive".to_string())
            },
            got
        );
    }

    #[test]
    fn falls_back_to_the_message_key() {
        let got = error_from_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            br#"{"message": "database unavailable"}"#,
        );

        assert_eq!(
            Error::Api {
                status: 500,
                message: Some("database unavailable".to_string())
            },
            got
        );
    }

    #[test]
    fn tolerates_a_non_json_body() {
        let got = error_from_response(StatusCode::BAD_GATEWAY, b"<html>bad gateway</html>");

        assert_eq!(
            Error::Api {
                status: 502,
                message: None
            },
            got
        );
    }
}
