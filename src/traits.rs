//! Traits for the remote platform boundary and extensibility

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};

use crate::reports::ReportRequest;
use crate::types::*;
use crate::utils::validation::invalid_identifiers;

/// Request/response contracts of the hosted data platform
///
/// Every bursar service receives an implementation of this trait at
/// construction time. The platform is the system of record: implementations
/// forward calls and translate payloads, they never keep authoritative state
/// on the client side.
#[async_trait]
pub trait FinancialPlatform: Send + Sync {
    /// Register financial data for many students in one call
    async fn bulk_register_student_financial_data(
        &self,
        records: &[BulkStudentFinancialRecord],
    ) -> FinanceResult<Vec<BulkOperationResult>>;

    /// Assign scholarships to many students in one call
    async fn bulk_register_scholarship_students(
        &self,
        records: &[BulkScholarshipRecord],
    ) -> FinanceResult<Vec<BulkOperationResult>>;

    /// Create one slip per student, all sharing a new batch identifier
    async fn generate_bank_slips_batch(
        &self,
        student_ids: &[String],
        amount: &BigDecimal,
        due_date: NaiveDate,
        description: &str,
    ) -> FinanceResult<BatchId>;

    /// Email every slip of a batch using the given template
    async fn send_bank_slips_batch(
        &self,
        batch_id: &BatchId,
        email_template: &str,
    ) -> FinanceResult<()>;

    /// Record a settlement against one slip
    async fn process_bank_slip_payment(
        &self,
        slip_id: &str,
        payment_amount: &BigDecimal,
        payment_date: DateTime<Utc>,
    ) -> FinanceResult<PaymentOutcome>;

    /// Compute accrued late fee and interest as of the platform's current date
    async fn calculate_late_fees(&self, request: &FeeRequest) -> FinanceResult<FeeBreakdown>;

    /// List bank slips, most distant due date first
    async fn list_bank_slips(&self) -> FinanceResult<Vec<BankSlip>>;

    /// Fetch a single bank slip
    async fn get_bank_slip(&self, slip_id: &str) -> FinanceResult<Option<BankSlip>>;

    /// List the user directory
    async fn list_users(&self) -> FinanceResult<Vec<DirectoryUser>>;

    /// Run one of the back-office reports and return its raw rows
    async fn run_report(&self, request: &ReportRequest) -> FinanceResult<Vec<serde_json::Value>>;
}

/// Trait for implementing recipient selection rules
pub trait RecipientValidator: Send + Sync {
    /// Validate a whole selection before any remote call is made
    fn validate_selection(&self, ids: &[String]) -> FinanceResult<()>;
}

/// All-or-nothing UUID gate: one malformed identifier rejects the selection
pub struct DefaultRecipientValidator;

impl RecipientValidator for DefaultRecipientValidator {
    fn validate_selection(&self, ids: &[String]) -> FinanceResult<()> {
        if ids.is_empty() {
            return Err(FinanceError::MissingField("recipients".to_string()));
        }

        let invalid = invalid_identifiers(ids);
        if !invalid.is_empty() {
            return Err(FinanceError::InvalidRecipients(invalid));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_recipient_validator() {
        let validator = DefaultRecipientValidator;
        let good = "3f2b8c1e-9d4a-4c6b-8e2f-1a2b3c4d5e6f".to_string();

        assert!(validator.validate_selection(&[good.clone()]).is_ok());
        assert!(matches!(
            validator.validate_selection(&[]),
            Err(FinanceError::MissingField(_))
        ));
        match validator.validate_selection(&[good, "nope".to_string()]) {
            Err(FinanceError::InvalidRecipients(ids)) => assert_eq!(ids, vec!["nope".to_string()]),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
