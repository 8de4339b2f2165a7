//! The client calls behind the transaction controller.

use async_trait::async_trait;

use crate::{
    Error,
    transaction::{
        CsvImport, Page, Transaction, TransactionDraft, TransactionId, TransactionPatch,
        TransactionQuery,
    },
};

/// Remote access to the transaction ledger.
#[async_trait]
pub trait TransactionClient: Send + Sync {
    /// Fetch one page of transactions matching `query`.
    async fn list_transactions(
        &self,
        query: &TransactionQuery,
    ) -> Result<Page<Transaction>, Error>;

    /// Fetch a single transaction by ID.
    async fn get_transaction(&self, id: TransactionId) -> Result<Transaction, Error>;

    /// Create a transaction.
    async fn create_transaction(&self, draft: &TransactionDraft) -> Result<Transaction, Error>;

    /// Replace a transaction's editable fields.
    async fn update_transaction(
        &self,
        id: TransactionId,
        patch: &TransactionPatch,
    ) -> Result<Transaction, Error>;

    /// Delete a transaction.
    async fn delete_transaction(&self, id: TransactionId) -> Result<(), Error>;

    /// Bulk create transactions from mapped CSV rows. Returns the created
    /// records.
    async fn import_transactions(&self, import: &CsvImport) -> Result<Vec<Transaction>, Error>;
}
