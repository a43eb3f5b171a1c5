//! Core types and data structures for the bursar back office

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::money::zero_if_null;

/// One row of the student financial data template
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BulkStudentFinancialRecord {
    /// Opaque external identifier of the student (required)
    pub student_id: String,
    pub bank_account: Option<String>,
    pub bank_code: Option<String>,
    pub agency_number: Option<String>,
    pub account_number: Option<String>,
    /// Taxpayer identifier (CPF/CNPJ)
    pub tax_id: Option<String>,
    pub billing_address: Option<String>,
    pub billing_city: Option<String>,
    pub billing_state: Option<String>,
    pub billing_zip_code: Option<String>,
}

impl BulkStudentFinancialRecord {
    /// Create a record carrying only the student identifier
    pub fn new(student_id: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            ..Default::default()
        }
    }
}

/// One scholarship assignment row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkScholarshipRecord {
    pub student_id: String,
    /// Scholarship definition; rows without it are reported back as per-row errors
    pub scholarship_id: Option<String>,
    pub start_date: NaiveDate,
    /// Inclusive end of the grant; never before `start_date`
    pub end_date: Option<NaiveDate>,
    /// Discount percentage in the 0-100 range
    pub discount_percentage: BigDecimal,
}

/// Outcome of a single row inside a bulk operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkRowStatus {
    Success,
    Error,
}

/// Per-row result reported by the platform for a bulk operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkOperationResult {
    pub student_id: String,
    #[serde(default)]
    pub scholarship_id: Option<String>,
    pub status: BulkRowStatus,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl BulkOperationResult {
    /// Create a successful row result
    pub fn success(student_id: impl Into<String>, scholarship_id: Option<String>) -> Self {
        Self {
            student_id: student_id.into(),
            scholarship_id,
            status: BulkRowStatus::Success,
            error_message: None,
        }
    }

    /// Create a failed row result with its business message
    pub fn error(
        student_id: impl Into<String>,
        scholarship_id: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            student_id: student_id.into(),
            scholarship_id,
            status: BulkRowStatus::Error,
            error_message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == BulkRowStatus::Success
    }
}

/// Lifecycle state of a bank slip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BankSlipStatus {
    Pending,
    Paid,
    Overdue,
    #[serde(alias = "cancelled")]
    Canceled,
}

impl BankSlipStatus {
    /// Wire name used by the platform
    pub fn as_str(&self) -> &'static str {
        match self {
            BankSlipStatus::Pending => "pending",
            BankSlipStatus::Paid => "paid",
            BankSlipStatus::Overdue => "overdue",
            BankSlipStatus::Canceled => "canceled",
        }
    }

    /// Operator-facing label
    pub fn label(&self) -> &'static str {
        match self {
            BankSlipStatus::Pending => "Pendente",
            BankSlipStatus::Paid => "Pago",
            BankSlipStatus::Overdue => "Vencido",
            BankSlipStatus::Canceled => "Cancelado",
        }
    }

    /// Whether a settlement may still be recorded against the slip
    pub fn is_payable(&self) -> bool {
        matches!(self, BankSlipStatus::Pending | BankSlipStatus::Overdue)
    }
}

impl fmt::Display for BankSlipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BankSlipStatus {
    type Err = FinanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(BankSlipStatus::Pending),
            "paid" => Ok(BankSlipStatus::Paid),
            "overdue" => Ok(BankSlipStatus::Overdue),
            "canceled" | "cancelled" => Ok(BankSlipStatus::Canceled),
            other => Err(FinanceError::InvalidField {
                field: "status".to_string(),
                reason: format!("unknown bank slip status '{}'", other),
            }),
        }
    }
}

/// Payment rail used to settle a slip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    BankSlip,
    Pix,
    CreditCard,
    DebitCard,
    Cash,
}

/// A payable billing instrument issued to one student
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "BankSlipRow")]
pub struct BankSlip {
    pub id: String,
    pub student_id: String,
    /// Original amount, always positive
    pub amount: BigDecimal,
    pub due_date: NaiveDate,
    pub barcode: Option<String>,
    pub status: BankSlipStatus,
    /// Correlation key of the generation call that created the slip
    pub batch_id: Option<String>,
    pub email_sent: bool,
    pub email_sent_at: Option<DateTime<Utc>>,
    pub payment_method: Option<PaymentMethod>,
    pub pix_key: Option<String>,
    pub qr_code_url: Option<String>,
    pub late_fee: BigDecimal,
    pub interest_rate: BigDecimal,
    pub discount_amount: BigDecimal,
    /// Last amount recorded by the platform. Fixed once the slip is paid;
    /// for unpaid slips use `FeeCalculator::amount_due` instead.
    pub final_amount: BigDecimal,
    pub bank_integration_id: Option<String>,
    pub external_id: Option<String>,
    pub notes: Option<String>,
    /// Set only when the slip transitions to paid
    pub payment_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Slip as stored by the platform, where most columns may be null
#[derive(Deserialize)]
struct BankSlipRow {
    id: String,
    student_id: String,
    amount: BigDecimal,
    due_date: NaiveDate,
    #[serde(default)]
    barcode: Option<String>,
    status: BankSlipStatus,
    #[serde(default)]
    batch_id: Option<String>,
    #[serde(default)]
    email_sent: Option<bool>,
    #[serde(default)]
    email_sent_at: Option<DateTime<Utc>>,
    #[serde(default)]
    payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pix_key: Option<String>,
    #[serde(default)]
    qr_code_url: Option<String>,
    #[serde(default, deserialize_with = "zero_if_null")]
    late_fee: BigDecimal,
    #[serde(default, deserialize_with = "zero_if_null")]
    interest_rate: BigDecimal,
    #[serde(default, deserialize_with = "zero_if_null")]
    discount_amount: BigDecimal,
    #[serde(default)]
    final_amount: Option<BigDecimal>,
    #[serde(default)]
    bank_integration_id: Option<String>,
    #[serde(default)]
    external_id: Option<String>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    payment_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BankSlipRow> for BankSlip {
    fn from(row: BankSlipRow) -> Self {
        Self {
            final_amount: row.final_amount.unwrap_or_else(|| row.amount.clone()),
            id: row.id,
            student_id: row.student_id,
            amount: row.amount,
            due_date: row.due_date,
            barcode: row.barcode,
            status: row.status,
            batch_id: row.batch_id,
            email_sent: row.email_sent.unwrap_or(false),
            email_sent_at: row.email_sent_at,
            payment_method: row.payment_method,
            pix_key: row.pix_key,
            qr_code_url: row.qr_code_url,
            late_fee: row.late_fee,
            interest_rate: row.interest_rate,
            discount_amount: row.discount_amount,
            bank_integration_id: row.bank_integration_id,
            external_id: row.external_id,
            notes: row.notes,
            payment_date: row.payment_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl BankSlip {
    /// Create a freshly issued pending slip
    pub fn new(
        id: String,
        student_id: String,
        amount: BigDecimal,
        due_date: NaiveDate,
        batch_id: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            student_id,
            final_amount: amount.clone(),
            amount,
            due_date,
            barcode: None,
            status: BankSlipStatus::Pending,
            batch_id,
            email_sent: false,
            email_sent_at: None,
            payment_method: None,
            pix_key: None,
            qr_code_url: None,
            late_fee: BigDecimal::from(0),
            interest_rate: BigDecimal::from(0),
            discount_amount: BigDecimal::from(0),
            bank_integration_id: None,
            external_id: None,
            notes: None,
            payment_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_paid(&self) -> bool {
        self.status == BankSlipStatus::Paid
    }
}

/// Opaque correlation key returned by a batch generation call
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(pub String);

impl BatchId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Entry of the externally owned user directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
}

/// Outcome of a settlement request as reported by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOutcome {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

/// Inputs of the remote late-fee computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeRequest {
    pub original_amount: BigDecimal,
    pub due_date: NaiveDate,
    /// Interest rate per period (e.g. 0.02 for 2% a month)
    pub interest_rate: BigDecimal,
    /// One-off late fee rate (e.g. 0.05 for 5%)
    pub late_fee_rate: BigDecimal,
}

/// Accrued charges on an amount at a given moment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub late_fee: BigDecimal,
    pub interest: BigDecimal,
    pub total_amount: BigDecimal,
}

impl FeeBreakdown {
    /// Breakdown for an amount that is not overdue
    pub fn not_due(amount: &BigDecimal) -> Self {
        Self {
            late_fee: BigDecimal::from(0),
            interest: BigDecimal::from(0),
            total_amount: amount.clone(),
        }
    }
}

/// Errors raised by bursar operations
#[derive(Debug, thiserror::Error)]
pub enum FinanceError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Missing required field: {0}")]
    MissingField(String),
    #[error("Invalid {field}: {reason}")]
    InvalidField { field: String, reason: String },
    #[error("Invalid recipient identifiers: {}", .0.join(", "))]
    InvalidRecipients(Vec<String>),
    #[error("Nothing to process")]
    NothingToProcess,
    #[error("CSV error: {0}")]
    Csv(String),
    #[error("Malformed CSV at line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },
    #[error("Remote operation '{operation}' failed: {reason}")]
    Remote { operation: String, reason: String },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Unexpected response: {0}")]
    Decode(String),
    #[error("Payment rejected: {0}")]
    PaymentRejected(String),
    #[error("Bank slip not found: {0}")]
    SlipNotFound(String),
    #[error("Bank slip {id} cannot be settled while {status}")]
    SlipNotPayable { id: String, status: BankSlipStatus },
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("I/O error on {path}: {reason}")]
    Io { path: String, reason: String },
}

impl FinanceError {
    /// Build a whole-batch failure for the named remote operation
    pub fn remote(operation: &str, reason: impl fmt::Display) -> Self {
        FinanceError::Remote {
            operation: operation.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether the failure was raised locally, before any remote call
    pub fn is_client_side(&self) -> bool {
        matches!(
            self,
            FinanceError::Validation(_)
                | FinanceError::MissingField(_)
                | FinanceError::InvalidField { .. }
                | FinanceError::InvalidRecipients(_)
                | FinanceError::NothingToProcess
                | FinanceError::MalformedRow { .. }
                | FinanceError::SlipNotPayable { .. }
        )
    }
}

impl From<csv::Error> for FinanceError {
    fn from(err: csv::Error) -> Self {
        FinanceError::Csv(err.to_string())
    }
}

impl From<reqwest::Error> for FinanceError {
    fn from(err: reqwest::Error) -> Self {
        FinanceError::Transport(err.to_string())
    }
}

/// Result type for bursar operations
pub type FinanceResult<T> = Result<T, FinanceError>;
