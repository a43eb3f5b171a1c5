//! HTTP client for the hosted platform's REST/RPC surface

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::config::PlatformConfig;
use crate::reports::ReportRequest;
use crate::traits::*;
use crate::types::*;

const SLIP_TABLE: &str = "bank_slips";

/// `FinancialPlatform` over the platform's HTTP API
///
/// One request per operation. No client timeout and no retries.
#[derive(Debug, Clone)]
pub struct RestPlatform {
    client: Client,
    config: PlatformConfig,
}

#[derive(Deserialize)]
struct LateFeeRow {
    late_fee: BigDecimal,
    interest: BigDecimal,
    total_amount: BigDecimal,
}

impl RestPlatform {
    pub fn new(config: PlatformConfig) -> FinanceResult<Self> {
        config.validate()?;
        Ok(Self {
            client: Client::new(),
            config,
        })
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    pub(crate) fn rpc_url(&self, name: &str) -> String {
        format!("{}/rest/v1/rpc/{}", self.config.base_url.trim_end_matches('/'), name)
    }

    pub(crate) fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.config.base_url.trim_end_matches('/'), table)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.config.api_key)
            .bearer_auth(self.config.bearer())
    }

    async fn rpc<T: DeserializeOwned>(&self, name: &str, params: Value) -> FinanceResult<T> {
        debug!(rpc = name, "calling platform");
        let response = self
            .authorize(self.client.post(self.rpc_url(name)))
            .json(&params)
            .send()
            .await
            .map_err(|e| {
                error!(rpc = name, error = %e, "platform unreachable");
                FinanceError::Transport(e.to_string())
            })?;
        decode(name, response).await
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> FinanceResult<Vec<T>> {
        debug!(table, "reading platform table");
        let response = self
            .authorize(self.client.get(self.table_url(table)))
            .query(query)
            .send()
            .await?;
        decode(table, response).await
    }
}

async fn decode<T: DeserializeOwned>(operation: &str, response: Response) -> FinanceResult<T> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        error!(operation, %status, "platform call failed");
        return Err(FinanceError::remote(operation, error_reason(status.as_u16(), &body)));
    }
    parse_body(operation, &body)
}

/// Void RPCs may answer with no body at all; that reads as JSON `null`
fn parse_body<T: DeserializeOwned>(operation: &str, body: &str) -> FinanceResult<T> {
    let body = if body.trim().is_empty() { "null" } else { body };
    serde_json::from_str(body).map_err(|e| FinanceError::Decode(format!("{}: {}", operation, e)))
}

/// Prefer the platform's own `message` field over the raw body
fn error_reason(status: u16, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| format!("HTTP {}: {}", status, body.trim()))
}

/// RPCs returning a table type come back as a list; unwrap the single row
fn single_row<T>(operation: &str, rows: Vec<T>) -> FinanceResult<T> {
    rows.into_iter()
        .next()
        .ok_or_else(|| FinanceError::Decode(format!("{}: empty response", operation)))
}

#[async_trait]
impl FinancialPlatform for RestPlatform {
    async fn bulk_register_student_financial_data(
        &self,
        records: &[BulkStudentFinancialRecord],
    ) -> FinanceResult<Vec<BulkOperationResult>> {
        self.rpc(
            "bulk_register_student_financial_data",
            json!({ "p_student_data": records }),
        )
        .await
    }

    async fn bulk_register_scholarship_students(
        &self,
        records: &[BulkScholarshipRecord],
    ) -> FinanceResult<Vec<BulkOperationResult>> {
        self.rpc(
            "bulk_register_scholarship_students",
            json!({ "p_scholarship_data": records }),
        )
        .await
    }

    async fn generate_bank_slips_batch(
        &self,
        student_ids: &[String],
        amount: &BigDecimal,
        due_date: NaiveDate,
        description: &str,
    ) -> FinanceResult<BatchId> {
        self.rpc(
            "generate_bank_slips_batch",
            json!({
                "p_student_ids": student_ids,
                "p_amount": amount,
                "p_due_date": due_date,
                "p_description": description,
            }),
        )
        .await
    }

    async fn send_bank_slips_batch(
        &self,
        batch_id: &BatchId,
        email_template: &str,
    ) -> FinanceResult<()> {
        let _: Value = self
            .rpc(
                "send_bank_slips_batch",
                json!({ "p_batch_id": batch_id, "p_email_template": email_template }),
            )
            .await?;
        Ok(())
    }

    async fn process_bank_slip_payment(
        &self,
        slip_id: &str,
        payment_amount: &BigDecimal,
        payment_date: DateTime<Utc>,
    ) -> FinanceResult<PaymentOutcome> {
        let rows: Vec<PaymentOutcome> = self
            .rpc(
                "process_bank_slip_payment",
                json!({
                    "p_bank_slip_id": slip_id,
                    "p_payment_amount": payment_amount,
                    "p_payment_date": payment_date,
                }),
            )
            .await?;
        single_row("process_bank_slip_payment", rows)
    }

    async fn calculate_late_fees(&self, request: &FeeRequest) -> FinanceResult<FeeBreakdown> {
        let rows: Vec<LateFeeRow> = self
            .rpc(
                "calculate_late_fees",
                json!({
                    "p_original_amount": request.original_amount,
                    "p_due_date": request.due_date,
                    "p_interest_rate": request.interest_rate,
                    "p_late_fee_rate": request.late_fee_rate,
                }),
            )
            .await?;
        let row = single_row("calculate_late_fees", rows)?;
        Ok(FeeBreakdown {
            late_fee: row.late_fee,
            interest: row.interest,
            total_amount: row.total_amount,
        })
    }

    async fn list_bank_slips(&self) -> FinanceResult<Vec<BankSlip>> {
        self.select(
            SLIP_TABLE,
            &[
                ("select", "*".to_string()),
                ("order", "due_date.desc".to_string()),
            ],
        )
        .await
    }

    async fn get_bank_slip(&self, slip_id: &str) -> FinanceResult<Option<BankSlip>> {
        let rows: Vec<BankSlip> = self
            .select(
                SLIP_TABLE,
                &[
                    ("select", "*".to_string()),
                    ("id", format!("eq.{}", slip_id)),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn list_users(&self) -> FinanceResult<Vec<DirectoryUser>> {
        self.select(
            &self.config.directory_table,
            &[
                ("select", "id,name,email,role".to_string()),
                ("order", "name.asc".to_string()),
            ],
        )
        .await
    }

    async fn run_report(&self, request: &ReportRequest) -> FinanceResult<Vec<Value>> {
        let value: Value = self.rpc(request.rpc_name(), request.rpc_params()).await?;
        Ok(match value {
            Value::Array(rows) => rows,
            Value::Null => Vec::new(),
            single => vec![single],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn platform(base: &str) -> RestPlatform {
        RestPlatform::new(PlatformConfig::new(base, "anon")).unwrap()
    }

    #[test]
    fn test_urls() {
        let p = platform("https://school.example.com/");
        assert_eq!(
            p.rpc_url("calculate_late_fees"),
            "https://school.example.com/rest/v1/rpc/calculate_late_fees"
        );
        assert_eq!(p.table_url("profiles"), "https://school.example.com/rest/v1/profiles");
    }

    #[test]
    fn test_error_reason_prefers_message() {
        assert_eq!(
            error_reason(400, r#"{"code":"P0001","message":"studentId not found"}"#),
            "studentId not found"
        );
        assert_eq!(error_reason(502, "bad gateway\n"), "HTTP 502: bad gateway");
    }

    #[test]
    fn test_empty_config_rejected() {
        assert!(RestPlatform::new(PlatformConfig::new("", "anon")).is_err());
    }

    #[test]
    fn test_blank_body_reads_as_null() {
        let value: Value = parse_body("send_bank_slips_batch", "").unwrap();
        assert_eq!(value, Value::Null);
        let value: Value = parse_body("send_bank_slips_batch", " \n").unwrap();
        assert_eq!(value, Value::Null);

        // Row-returning RPCs still need rows
        let rows: FinanceResult<Vec<PaymentOutcome>> = parse_body("process_bank_slip_payment", "");
        assert!(matches!(rows, Err(FinanceError::Decode(_))));
    }

    #[tokio::test]
    async fn test_send_batch_accepts_no_content() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let mut seen = Vec::new();
            // Read headers plus the small JSON body
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                seen.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&seen);
                if n == 0 || (text.contains("\r\n\r\n") && text.trim_end().ends_with('}')) {
                    break;
                }
            }
            socket
                .write_all(b"HTTP/1.1 204 No Content\r\nConnection: close\r\n\r\n")
                .await
                .unwrap();
            String::from_utf8_lossy(&seen).to_string()
        });

        let platform = platform(&format!("http://{}", addr));
        platform
            .send_bank_slips_batch(&BatchId("b-7".to_string()), "monthly")
            .await
            .unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /rest/v1/rpc/send_bank_slips_batch"));
        assert!(request.contains("\"p_batch_id\":\"b-7\""));
    }

    #[test]
    fn test_batch_id_decodes_from_bare_string() {
        let id: BatchId = serde_json::from_str("\"b-1\"").unwrap();
        assert_eq!(id.as_str(), "b-1");
    }
}
