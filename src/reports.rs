//! Back-office report requests
//!
//! Each report kind carries its own parameter record and maps to exactly one
//! platform RPC, so the set of reports offered to the operator and the set of
//! calls the backend expects cannot drift apart.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Inclusive reporting period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodParams {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Restrict to one origin/destination of funds
    pub origin_destination: Option<String>,
}

/// Aggregation bucket for the financial summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl PeriodType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodType::Daily => "daily",
            PeriodType::Weekly => "weekly",
            PeriodType::Monthly => "monthly",
            PeriodType::Yearly => "yearly",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryParams {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub period_type: PeriodType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtSettlementParams {
    pub student_id: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDelinquencyParams {
    pub course_id: String,
}

/// A report the back office can run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportRequest {
    FinancialBalance(PeriodParams),
    FinancialSummary(SummaryParams),
    DebtSettlement(DebtSettlementParams),
    ClassDelinquency(ClassDelinquencyParams),
    Dashboard,
}

impl ReportRequest {
    /// Name of the platform RPC serving this report
    pub fn rpc_name(&self) -> &'static str {
        match self {
            ReportRequest::FinancialBalance(_) => "get_financial_balance_report",
            ReportRequest::FinancialSummary(_) => "get_financial_summary_report",
            ReportRequest::DebtSettlement(_) => "get_debt_settlement_report",
            ReportRequest::ClassDelinquency(_) => "get_class_delinquency_report",
            ReportRequest::Dashboard => "get_financial_dashboard",
        }
    }

    /// RPC parameters in the platform's naming convention
    pub fn rpc_params(&self) -> serde_json::Value {
        match self {
            ReportRequest::FinancialBalance(p) => json!({
                "p_start_date": p.start_date,
                "p_end_date": p.end_date,
                "p_origin_destination": p.origin_destination,
            }),
            ReportRequest::FinancialSummary(p) => json!({
                "p_start_date": p.start_date,
                "p_end_date": p.end_date,
                "p_period_type": p.period_type.as_str(),
            }),
            ReportRequest::DebtSettlement(p) => json!({
                "p_student_id": p.student_id,
                "p_start_date": p.start_date,
                "p_end_date": p.end_date,
            }),
            ReportRequest::ClassDelinquency(p) => json!({
                "p_course_id": p.course_id,
            }),
            ReportRequest::Dashboard => json!({}),
        }
    }
}
