//! The transaction ledger: a paginated, filterable window onto the remote
//! transaction history, plus CRUD and CSV import.
//!
//! The controller keeps one page window in memory. Fetches either reset the
//! window or extend it (infinite scroll), and concurrent fetches are fenced
//! by a request sequence number so only the newest response lands.

use std::{collections::HashMap, sync::Mutex};

use serde::{Deserialize, Serialize};
use time::Date;

use crate::{Error, amount, clients::TransactionClient};

/// The ID of a [Transaction] on the remote service.
pub type TransactionId = i64;

/// Whether a transaction adds to or draws from the balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    /// Money coming in.
    Income,
    /// Money going out.
    Expense,
}

/// A single ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// The server-side ID.
    pub id: TransactionId,
    /// The budget section this transaction is categorized under, if any.
    #[serde(default)]
    pub section_id: Option<i64>,
    /// The name of that section, denormalized for display.
    #[serde(default)]
    pub section_name: Option<String>,
    /// The budget item this transaction is attributed to, if any.
    #[serde(default)]
    pub budget_item_id: Option<i64>,
    /// The name of that item, denormalized for display.
    #[serde(default)]
    pub budget_item_name: Option<String>,
    /// Income or expense.
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// The date the transaction occurred.
    pub transaction_date: Date,
    /// Who the money went to or came from.
    #[serde(default)]
    pub merchant: String,
    /// The transaction amount, always non-negative; `kind` carries the sign.
    #[serde(default, deserialize_with = "amount::lenient_f64")]
    pub amount: f64,
    /// Free-form note.
    #[serde(default)]
    pub note: Option<String>,
    /// When the record was created, as reported by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// The fields for creating a new transaction.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDraft {
    /// The section to categorize under, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_id: Option<i64>,
    /// The budget item to attribute to, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_item_id: Option<i64>,
    /// Income or expense.
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// The date the transaction occurred.
    pub transaction_date: Date,
    /// Who the money went to or came from.
    pub merchant: String,
    /// The transaction amount.
    pub amount: f64,
    /// Free-form note.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A full replacement of a transaction's editable fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPatch {
    /// The section to categorize under, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_id: Option<i64>,
    /// The budget item to attribute to, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_item_id: Option<i64>,
    /// Income or expense.
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// The date the transaction occurred.
    pub transaction_date: Date,
    /// Who the money went to or came from.
    pub merchant: String,
    /// The transaction amount.
    pub amount: f64,
    /// Free-form note.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A batch of raw CSV rows plus the mapping that tells the server which
/// column holds which transaction field.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvImport {
    /// Field name (e.g. "merchant") to zero-based column index.
    pub column_mapping: HashMap<String, usize>,
    /// The raw rows, one inner vector per CSV line.
    pub rows: Vec<Vec<String>>,
    /// The date format the date column uses, e.g. "MM/dd/yyyy".
    pub date_format: String,
    /// Whether the first row is a header and should be skipped.
    pub skip_first_row: bool,
}

/// The active filter criteria. Unset fields do not constrain the listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    /// Only transactions on or after this date.
    pub start_date: Option<Date>,
    /// Only transactions on or before this date.
    pub end_date: Option<Date>,
    /// Only income or only expenses.
    pub kind: Option<TransactionType>,
    /// Only transactions in this section.
    pub section_id: Option<i64>,
    /// Only transactions attributed to this budget item.
    pub budget_item_id: Option<i64>,
    /// Match against the denormalized section name.
    pub section_name: Option<String>,
    /// Match against the denormalized budget item name.
    pub budget_item_name: Option<String>,
    /// Substring match against the merchant. The empty string means
    /// unfiltered and is not sent.
    pub merchant: String,
}

/// The query string parameters for a transaction listing. `None` fields and
/// blank strings are omitted entirely rather than sent empty.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    start_date: Option<Date>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_date: Option<Date>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<TransactionType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    section_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    budget_item_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    section_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    budget_item_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    merchant: Option<String>,
    page: usize,
    size: usize,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl TransactionQuery {
    /// Build the query for one page of `filter`'s results.
    pub fn new(filter: &TransactionFilter, page: usize, size: usize) -> Self {
        let filter = filter.clone();
        TransactionQuery {
            start_date: filter.start_date,
            end_date: filter.end_date,
            kind: filter.kind,
            section_id: filter.section_id,
            budget_item_id: filter.budget_item_id,
            section_name: non_blank(filter.section_name),
            budget_item_name: non_blank(filter.budget_item_name),
            merchant: non_blank(Some(filter.merchant)),
            page,
            size,
        }
    }

    /// Render as a URL query string (no leading '?').
    pub fn to_query_string(&self) -> Result<String, Error> {
        serde_urlencoded::to_string(self).map_err(|e| Error::InvalidRequest(e.to_string()))
    }
}

/// One page of results as the remote service shapes them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// The records on this page.
    #[serde(default = "Vec::new")]
    pub content: Vec<T>,
    /// The zero-based page number.
    pub number: usize,
    /// The requested page size.
    pub size: usize,
    /// The total number of records across all pages.
    pub total_elements: usize,
    /// The total number of pages.
    pub total_pages: usize,
}

/// The local pagination cursor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageInfo {
    /// The zero-based page most recently fetched.
    pub page: usize,
    /// The page size sent with each request.
    pub size: usize,
    /// Total records, as of the last successful fetch.
    pub total_elements: usize,
    /// Total pages, as of the last successful fetch.
    pub total_pages: usize,
}

impl Default for PageInfo {
    fn default() -> Self {
        PageInfo {
            page: 0,
            size: 20,
            total_elements: 0,
            total_pages: 0,
        }
    }
}

#[derive(Debug, Default)]
struct TransactionState {
    transactions: Vec<Transaction>,
    filter: TransactionFilter,
    page_info: PageInfo,
    loading: bool,
    error: Option<String>,
    fetch_seq: u64,
}

/// Holds the loaded window of the transaction ledger.
///
/// Error policy: fetches record the generic listing error and clear the
/// window; create, update, delete and import record a message and also
/// return the error so callers can react (e.g. keep a form open).
#[derive(Debug)]
pub struct TransactionController<C> {
    client: C,
    state: Mutex<TransactionState>,
}

const FETCH_ERROR: &str = "Unable to load transactions. Please try again later.";

impl<C> TransactionController<C>
where
    C: TransactionClient,
{
    /// Create a controller around `client`. No request is issued until the
    /// first fetch.
    pub fn new(client: C) -> Self {
        Self {
            client,
            state: Mutex::new(TransactionState::default()),
        }
    }

    /// A snapshot of the loaded transaction window.
    pub fn transactions(&self) -> Vec<Transaction> {
        self.state.lock().unwrap().transactions.clone()
    }

    /// A snapshot of the active filter.
    pub fn filter(&self) -> TransactionFilter {
        self.state.lock().unwrap().filter.clone()
    }

    /// A snapshot of the pagination cursor.
    pub fn page_info(&self) -> PageInfo {
        self.state.lock().unwrap().page_info
    }

    /// Whether a fetch is currently in flight.
    pub fn is_loading(&self) -> bool {
        self.state.lock().unwrap().loading
    }

    /// The most recently recorded error message, if any.
    pub fn error(&self) -> Option<String> {
        self.state.lock().unwrap().error.clone()
    }

    /// Fetch the current page under the active filter.
    ///
    /// With `reset` the window is replaced by the fetched page; without it
    /// the page is appended (infinite scroll). On failure the window is
    /// cleared and an error recorded; the pagination cursor is left as it
    /// was, so a later [load_more](Self::load_more) resumes from the same
    /// position.
    pub async fn fetch_transactions(&self, reset: bool) {
        let (query, seq) = {
            let mut state = self.state.lock().unwrap();
            state.loading = true;
            state.error = None;
            state.fetch_seq += 1;
            // The requested page is not written back to the cursor; only a
            // successful response moves it, so a failed fetch leaves the
            // cursor where the last good page left it.
            let page = if reset { 0 } else { state.page_info.page };
            (
                TransactionQuery::new(&state.filter, page, state.page_info.size),
                state.fetch_seq,
            )
        };

        let result = self.client.list_transactions(&query).await;

        let mut state = self.state.lock().unwrap();
        if seq != state.fetch_seq {
            tracing::debug!("discarding stale transaction page response");
            return;
        }

        match result {
            Ok(page) => {
                if reset {
                    state.transactions = page.content;
                } else {
                    state.transactions.extend(page.content);
                }
                state.page_info = PageInfo {
                    page: page.number,
                    size: page.size,
                    total_elements: page.total_elements,
                    total_pages: page.total_pages,
                };
            }
            Err(error) => {
                tracing::warn!("could not fetch transactions: {error}");
                state.transactions.clear();
                state.error = Some(FETCH_ERROR.to_string());
            }
        }
        state.loading = false;
    }

    /// Fetch the next page and append it to the window. No-op when a fetch
    /// is already in flight or the last page has been reached.
    pub async fn load_more(&self) {
        {
            let mut state = self.state.lock().unwrap();
            if state.loading || state.page_info.page + 1 >= state.page_info.total_pages {
                return;
            }
            state.page_info.page += 1;
        }

        self.fetch_transactions(false).await;
    }

    /// Apply `update` to the filter, then refetch from the first page.
    pub async fn set_filters(&self, update: impl FnOnce(&mut TransactionFilter)) {
        {
            let mut state = self.state.lock().unwrap();
            update(&mut state.filter);
        }

        self.fetch_transactions(true).await;
    }

    /// Drop every filter criterion, then refetch from the first page.
    pub async fn clear_filters(&self) {
        {
            let mut state = self.state.lock().unwrap();
            state.filter = TransactionFilter::default();
        }

        self.fetch_transactions(true).await;
    }

    /// Create a transaction and prepend the server's representation to the
    /// window. The window is not refetched, so the new record shows up
    /// immediately even if it would not match the active filter.
    pub async fn create_transaction(&self, draft: &TransactionDraft) -> Result<Transaction, Error> {
        match self.client.create_transaction(draft).await {
            Ok(transaction) => {
                let mut state = self.state.lock().unwrap();
                state.transactions.insert(0, transaction.clone());
                state.page_info.total_elements += 1;
                Ok(transaction)
            }
            Err(error) => {
                self.record_error(&error, "Failed to create transaction");
                Err(error)
            }
        }
    }

    /// Update a transaction and replace the local copy if it is in the
    /// window. A record outside the window is still updated remotely.
    pub async fn update_transaction(
        &self,
        id: TransactionId,
        patch: &TransactionPatch,
    ) -> Result<Transaction, Error> {
        match self.client.update_transaction(id, patch).await {
            Ok(transaction) => {
                let mut state = self.state.lock().unwrap();
                if let Some(existing) = state
                    .transactions
                    .iter_mut()
                    .find(|transaction| transaction.id == id)
                {
                    *existing = transaction.clone();
                }
                Ok(transaction)
            }
            Err(error) => {
                self.record_error(&error, "Failed to update transaction");
                Err(error)
            }
        }
    }

    /// Delete a transaction and drop it from the window.
    pub async fn delete_transaction(&self, id: TransactionId) -> Result<(), Error> {
        match self.client.delete_transaction(id).await {
            Ok(()) => {
                let mut state = self.state.lock().unwrap();
                state.transactions.retain(|transaction| transaction.id != id);
                state.page_info.total_elements =
                    state.page_info.total_elements.saturating_sub(1);
                Ok(())
            }
            Err(error) => {
                self.record_error(&error, "Failed to delete transaction");
                Err(error)
            }
        }
    }

    /// Bulk import transactions from mapped CSV rows, then refetch the
    /// window from the first page so it reflects the imported records in
    /// server order. Returns the created transactions.
    pub async fn import_transactions(&self, import: &CsvImport) -> Result<Vec<Transaction>, Error> {
        match self.client.import_transactions(import).await {
            Ok(created) => {
                self.fetch_transactions(true).await;
                Ok(created)
            }
            Err(error) => {
                self.record_error(&error, "Failed to import transactions");
                Err(error)
            }
        }
    }

    fn record_error(&self, error: &Error, fallback: &str) {
        tracing::error!("{fallback}: {error}");
        self.state.lock().unwrap().error = Some(error.user_message(fallback));
    }
}

#[cfg(test)]
fn test_transaction(id: TransactionId, merchant: &str, amount: f64) -> Transaction {
    Transaction {
        id,
        section_id: None,
        section_name: None,
        budget_item_id: None,
        budget_item_name: None,
        kind: TransactionType::Expense,
        transaction_date: time::macros::date!(2025 - 06 - 15),
        merchant: merchant.to_string(),
        amount,
        note: None,
        created_at: None,
    }
}

#[cfg(test)]
fn test_page(content: Vec<Transaction>, number: usize, total_pages: usize) -> Page<Transaction> {
    let total_elements = content.len() * total_pages.max(1);
    Page {
        content,
        number,
        size: 20,
        total_elements,
        total_pages,
    }
}



#[cfg(test)]
mod fencing_tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use async_trait::async_trait;
    use tokio::sync::oneshot;

    use super::{
        CsvImport, Page, Transaction, TransactionController, TransactionDraft, TransactionId,
        TransactionPatch, TransactionQuery, test_page, test_transaction,
    };
    use crate::{Error, clients::TransactionClient};

    /// Blocks the first listing call on a gate so a second request can
    /// overtake it.
    struct GatedClient {
        gate: Mutex<Option<oneshot::Receiver<()>>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TransactionClient for GatedClient {
        async fn list_transactions(
            &self,
            _query: &TransactionQuery,
        ) -> Result<Page<Transaction>, Error> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == 0 {
                let gate = self.gate.lock().unwrap().take().unwrap();
                gate.await.ok();
                Ok(test_page(vec![test_transaction(1, "Stale", 1.0)], 0, 1))
            } else {
                Ok(test_page(vec![test_transaction(2, "Fresh", 2.0)], 0, 1))
            }
        }

        async fn get_transaction(&self, _id: TransactionId) -> Result<Transaction, Error> {
            todo!()
        }

        async fn create_transaction(
            &self,
            _draft: &TransactionDraft,
        ) -> Result<Transaction, Error> {
            todo!()
        }

        async fn update_transaction(
            &self,
            _id: TransactionId,
            _patch: &TransactionPatch,
        ) -> Result<Transaction, Error> {
            todo!()
        }

        async fn delete_transaction(&self, _id: TransactionId) -> Result<(), Error> {
            todo!()
        }

        async fn import_transactions(
            &self,
            _import: &CsvImport,
        ) -> Result<Vec<Transaction>, Error> {
            todo!()
        }
    }

    #[tokio::test]
    async fn stale_response_is_discarded() {
        let (release, gate) = oneshot::channel();
        let controller = TransactionController::new(GatedClient {
            gate: Mutex::new(Some(gate)),
            calls: AtomicUsize::new(0),
        });

        // The first fetch parks on the gate; the second completes first and
        // must win even though the first response arrives afterwards.
        let first = controller.fetch_transactions(true);
        let second = async {
            // Let the first fetch reach the client before overtaking it.
            tokio::task::yield_now().await;
            controller.fetch_transactions(true).await;
            release.send(()).ok();
        };
        tokio::join!(first, second);

        let got = controller.transactions();
        assert_eq!(1, got.len());
        assert_eq!("Fresh", got[0].merchant);
        assert!(!controller.is_loading());
    }

    #[tokio::test]
    async fn load_more_is_noop_while_a_fetch_is_in_flight() {
        let (release, gate) = oneshot::channel();
        let controller = TransactionController::new(GatedClient {
            gate: Mutex::new(Some(gate)),
            calls: AtomicUsize::new(0),
        });

        let first = controller.fetch_transactions(true);
        let second = async {
            tokio::task::yield_now().await;
            // The loading guard must bail before issuing a request.
            controller.load_more().await;
            release.send(()).ok();
        };
        tokio::join!(first, second);

        assert_eq!(1, controller.client.calls.load(Ordering::SeqCst));
    }
}
