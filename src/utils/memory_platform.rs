//! In-memory platform implementation for testing

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::reports::ReportRequest;
use crate::traits::*;
use crate::types::*;
use crate::utils::money::round_currency;

/// Days in the interest accrual period
const INTEREST_PERIOD_DAYS: i64 = 30;

#[derive(Debug, Default)]
struct PlatformState {
    slips: HashMap<String, BankSlip>,
    users: Vec<DirectoryUser>,
    financial_data: HashMap<String, BulkStudentFinancialRecord>,
    scholarships: Vec<BulkScholarshipRecord>,
    rejected_students: HashMap<String, String>,
    sent_batches: Vec<(BatchId, String)>,
    report_rows: HashMap<String, Vec<serde_json::Value>>,
    calls: HashMap<String, usize>,
    fail_next: Option<String>,
    fail_operation: HashMap<String, String>,
    today: Option<NaiveDate>,
}

/// In-memory platform for testing and development
///
/// Clones share state, so a test can keep a handle for scripting and
/// assertions while the service under test owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryPlatform {
    state: Arc<RwLock<PlatformState>>,
}

impl MemoryPlatform {
    /// Create a new, empty memory platform
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all data and scripting (useful for testing)
    pub fn clear(&self) {
        *self.state.write() = PlatformState::default();
    }

    /// Number of times the named operation was invoked
    pub fn call_count(&self, operation: &str) -> usize {
        self.state.read().calls.get(operation).copied().unwrap_or(0)
    }

    /// Make the next call, whatever it is, fail as a whole
    pub fn fail_next_call(&self, reason: impl Into<String>) {
        self.state.write().fail_next = Some(reason.into());
    }

    /// Make the next call of the named operation fail as a whole
    pub fn fail_next_call_of(&self, operation: impl Into<String>, reason: impl Into<String>) {
        self.state
            .write()
            .fail_operation
            .insert(operation.into(), reason.into());
    }

    /// Report every bulk row of `student_id` as an error with `message`
    pub fn reject_student(&self, student_id: impl Into<String>, message: impl Into<String>) {
        self.state
            .write()
            .rejected_students
            .insert(student_id.into(), message.into());
    }

    /// Pin the platform's current date used for fee accrual
    pub fn set_today(&self, today: NaiveDate) {
        self.state.write().today = Some(today);
    }

    /// The platform's current date
    pub fn today(&self) -> NaiveDate {
        self.state
            .read()
            .today
            .unwrap_or_else(|| Utc::now().date_naive())
    }

    pub fn insert_slip(&self, slip: BankSlip) {
        self.state.write().slips.insert(slip.id.clone(), slip);
    }

    pub fn add_user(&self, user: DirectoryUser) {
        self.state.write().users.push(user);
    }

    /// Rows returned for the report with the given RPC name
    pub fn set_report_rows(&self, rpc_name: &str, rows: Vec<serde_json::Value>) {
        self.state
            .write()
            .report_rows
            .insert(rpc_name.to_string(), rows);
    }

    /// Slips created by one generation call
    pub fn slips_in_batch(&self, batch_id: &BatchId) -> Vec<BankSlip> {
        let mut slips: Vec<BankSlip> = self
            .state
            .read()
            .slips
            .values()
            .filter(|s| s.batch_id.as_deref() == Some(batch_id.as_str()))
            .cloned()
            .collect();
        slips.sort_by(|a, b| a.student_id.cmp(&b.student_id));
        slips
    }

    /// Batches sent by email, with the template used
    pub fn sent_batches(&self) -> Vec<(BatchId, String)> {
        self.state.read().sent_batches.clone()
    }

    /// Financial data registered for a student
    pub fn financial_data(&self, student_id: &str) -> Option<BulkStudentFinancialRecord> {
        self.state.read().financial_data.get(student_id).cloned()
    }

    /// Scholarship assignments accepted so far
    pub fn scholarships(&self) -> Vec<BulkScholarshipRecord> {
        self.state.read().scholarships.clone()
    }

    fn begin(&self, operation: &str) -> FinanceResult<()> {
        let mut state = self.state.write();
        *state.calls.entry(operation.to_string()).or_insert(0) += 1;
        let scripted = state.fail_operation.remove(operation);
        match scripted.or_else(|| state.fail_next.take()) {
            Some(reason) => Err(FinanceError::remote(operation, reason)),
            None => Ok(()),
        }
    }

    fn accrue(&self, request: &FeeRequest) -> FeeBreakdown {
        let days_overdue = (self.today() - request.due_date).num_days();
        if days_overdue <= 0 {
            return FeeBreakdown::not_due(&request.original_amount);
        }

        let late_fee = round_currency(&(&request.original_amount * &request.late_fee_rate));
        let interest = round_currency(
            &(&request.original_amount * &request.interest_rate * BigDecimal::from(days_overdue)
                / BigDecimal::from(INTEREST_PERIOD_DAYS)),
        );
        let total_amount = round_currency(&(&request.original_amount + &late_fee + &interest));

        FeeBreakdown {
            late_fee,
            interest,
            total_amount,
        }
    }
}

#[async_trait]
impl FinancialPlatform for MemoryPlatform {
    async fn bulk_register_student_financial_data(
        &self,
        records: &[BulkStudentFinancialRecord],
    ) -> FinanceResult<Vec<BulkOperationResult>> {
        self.begin("bulk_register_student_financial_data")?;
        let mut state = self.state.write();

        let mut results = Vec::with_capacity(records.len());
        for record in records {
            let rejection = state.rejected_students.get(&record.student_id).cloned();
            if let Some(message) = rejection {
                results.push(BulkOperationResult::error(
                    record.student_id.clone(),
                    None,
                    message,
                ));
                continue;
            }
            state
                .financial_data
                .insert(record.student_id.clone(), record.clone());
            results.push(BulkOperationResult::success(record.student_id.clone(), None));
        }
        Ok(results)
    }

    async fn bulk_register_scholarship_students(
        &self,
        records: &[BulkScholarshipRecord],
    ) -> FinanceResult<Vec<BulkOperationResult>> {
        self.begin("bulk_register_scholarship_students")?;
        let mut state = self.state.write();

        let mut results = Vec::with_capacity(records.len());
        for record in records {
            let scholarship_id = record.scholarship_id.clone();
            let rejection = state.rejected_students.get(&record.student_id).cloned();
            if let Some(message) = rejection {
                results.push(BulkOperationResult::error(
                    record.student_id.clone(),
                    scholarship_id,
                    message,
                ));
            } else if scholarship_id.is_none() {
                results.push(BulkOperationResult::error(
                    record.student_id.clone(),
                    None,
                    "scholarship_id is required",
                ));
            } else {
                state.scholarships.push(record.clone());
                results.push(BulkOperationResult::success(
                    record.student_id.clone(),
                    scholarship_id,
                ));
            }
        }
        Ok(results)
    }

    async fn generate_bank_slips_batch(
        &self,
        student_ids: &[String],
        amount: &BigDecimal,
        due_date: NaiveDate,
        description: &str,
    ) -> FinanceResult<BatchId> {
        self.begin("generate_bank_slips_batch")?;
        let batch_id = BatchId(Uuid::new_v4().to_string());
        let mut state = self.state.write();

        for student_id in student_ids {
            let mut slip = BankSlip::new(
                Uuid::new_v4().to_string(),
                student_id.clone(),
                round_currency(amount),
                due_date,
                Some(batch_id.0.clone()),
            );
            if !description.is_empty() {
                slip.notes = Some(description.to_string());
            }
            state.slips.insert(slip.id.clone(), slip);
        }
        Ok(batch_id)
    }

    async fn send_bank_slips_batch(
        &self,
        batch_id: &BatchId,
        email_template: &str,
    ) -> FinanceResult<()> {
        self.begin("send_bank_slips_batch")?;
        let mut state = self.state.write();
        let now = Utc::now();

        let mut found = false;
        for slip in state
            .slips
            .values_mut()
            .filter(|s| s.batch_id.as_deref() == Some(batch_id.as_str()))
        {
            slip.email_sent = true;
            slip.email_sent_at = Some(now);
            slip.updated_at = now;
            found = true;
        }
        if !found {
            return Err(FinanceError::remote(
                "send_bank_slips_batch",
                format!("batch {} not found", batch_id),
            ));
        }

        state
            .sent_batches
            .push((batch_id.clone(), email_template.to_string()));
        Ok(())
    }

    async fn process_bank_slip_payment(
        &self,
        slip_id: &str,
        payment_amount: &BigDecimal,
        payment_date: DateTime<Utc>,
    ) -> FinanceResult<PaymentOutcome> {
        self.begin("process_bank_slip_payment")?;
        let mut state = self.state.write();

        let slip = match state.slips.get_mut(slip_id) {
            Some(slip) => slip,
            None => {
                return Ok(PaymentOutcome {
                    success: false,
                    message: "Bank slip not found".to_string(),
                    transaction_id: None,
                })
            }
        };
        if !slip.status.is_payable() {
            return Ok(PaymentOutcome {
                success: false,
                message: format!("Bank slip is already {}", slip.status),
                transaction_id: None,
            });
        }
        if *payment_amount <= BigDecimal::from(0) {
            return Ok(PaymentOutcome {
                success: false,
                message: "Payment amount must be positive".to_string(),
                transaction_id: None,
            });
        }

        slip.status = BankSlipStatus::Paid;
        slip.payment_date = Some(payment_date);
        slip.final_amount = round_currency(payment_amount);
        slip.updated_at = Utc::now();

        Ok(PaymentOutcome {
            success: true,
            message: "Payment processed successfully".to_string(),
            transaction_id: Some(Uuid::new_v4().to_string()),
        })
    }

    async fn calculate_late_fees(&self, request: &FeeRequest) -> FinanceResult<FeeBreakdown> {
        self.begin("calculate_late_fees")?;
        Ok(self.accrue(request))
    }

    async fn list_bank_slips(&self) -> FinanceResult<Vec<BankSlip>> {
        self.begin("list_bank_slips")?;
        let mut slips: Vec<BankSlip> = self.state.read().slips.values().cloned().collect();
        slips.sort_by(|a, b| b.due_date.cmp(&a.due_date).then_with(|| a.id.cmp(&b.id)));
        Ok(slips)
    }

    async fn get_bank_slip(&self, slip_id: &str) -> FinanceResult<Option<BankSlip>> {
        self.begin("get_bank_slip")?;
        Ok(self.state.read().slips.get(slip_id).cloned())
    }

    async fn list_users(&self) -> FinanceResult<Vec<DirectoryUser>> {
        self.begin("list_users")?;
        Ok(self.state.read().users.clone())
    }

    async fn run_report(&self, request: &ReportRequest) -> FinanceResult<Vec<serde_json::Value>> {
        self.begin(request.rpc_name())?;
        Ok(self
            .state
            .read()
            .report_rows
            .get(request.rpc_name())
            .cloned()
            .unwrap_or_default())
    }
}
