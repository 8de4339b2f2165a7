//! The client calls behind the salary controller.

use async_trait::async_trait;

use crate::{
    Error,
    salary::{Salary, SalaryDraft, SalaryId},
};

/// Remote access to salary records.
#[async_trait]
pub trait SalaryClient: Send + Sync {
    /// Fetch every salary record.
    async fn list_salaries(&self) -> Result<Vec<Salary>, Error>;

    /// Fetch a single salary record by ID.
    async fn get_salary(&self, id: SalaryId) -> Result<Salary, Error>;

    /// Create a salary record. The server computes and returns the net pay.
    async fn create_salary(&self, draft: &SalaryDraft) -> Result<Salary, Error>;

    /// Replace a salary record's fields. The server recomputes the net pay.
    async fn update_salary(&self, id: SalaryId, draft: &SalaryDraft) -> Result<Salary, Error>;

    /// Delete a salary record.
    async fn delete_salary(&self, id: SalaryId) -> Result<(), Error>;
}
