//! CSV parsing and field mapping for bulk imports
//!
//! Input is plain comma-delimited text with a header row. Quoting is not
//! supported: a value may not contain a comma, a newline or a quote. Every
//! header is matched against its snake_case and camelCase spelling; columns
//! that match no field are ignored.
//!
//! A file is accepted or rejected as a whole. A row whose field count differs
//! from the header, a value carrying a quote, a missing student id, an
//! unreadable date, an inverted grant window or an out-of-range discount
//! rejects the file with the offending line number.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use tracing::debug;

use crate::types::*;
use crate::utils::validation::validate_percentage;

/// Columns of the student financial data template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StudentField {
    StudentId,
    BankAccount,
    BankCode,
    AgencyNumber,
    AccountNumber,
    TaxId,
    BillingAddress,
    BillingCity,
    BillingState,
    BillingZipCode,
}

impl StudentField {
    /// All columns in template order
    pub const ALL: [StudentField; 10] = [
        StudentField::StudentId,
        StudentField::BankAccount,
        StudentField::BankCode,
        StudentField::AgencyNumber,
        StudentField::AccountNumber,
        StudentField::TaxId,
        StudentField::BillingAddress,
        StudentField::BillingCity,
        StudentField::BillingState,
        StudentField::BillingZipCode,
    ];

    /// Resolve a header cell to a column
    pub fn from_header(header: &str) -> Option<Self> {
        match header {
            "student_id" | "studentId" => Some(StudentField::StudentId),
            "bank_account" | "bankAccount" => Some(StudentField::BankAccount),
            "bank_code" | "bankCode" => Some(StudentField::BankCode),
            "agency_number" | "agencyNumber" => Some(StudentField::AgencyNumber),
            "account_number" | "accountNumber" => Some(StudentField::AccountNumber),
            "tax_id" | "taxId" => Some(StudentField::TaxId),
            "billing_address" | "billingAddress" => Some(StudentField::BillingAddress),
            "billing_city" | "billingCity" => Some(StudentField::BillingCity),
            "billing_state" | "billingState" => Some(StudentField::BillingState),
            "billing_zip_code" | "billingZipCode" => Some(StudentField::BillingZipCode),
            _ => None,
        }
    }

    /// Canonical header spelling
    pub fn header(&self) -> &'static str {
        match self {
            StudentField::StudentId => "student_id",
            StudentField::BankAccount => "bank_account",
            StudentField::BankCode => "bank_code",
            StudentField::AgencyNumber => "agency_number",
            StudentField::AccountNumber => "account_number",
            StudentField::TaxId => "tax_id",
            StudentField::BillingAddress => "billing_address",
            StudentField::BillingCity => "billing_city",
            StudentField::BillingState => "billing_state",
            StudentField::BillingZipCode => "billing_zip_code",
        }
    }

    fn assign(&self, record: &mut BulkStudentFinancialRecord, value: String) {
        let slot = match self {
            StudentField::StudentId => {
                record.student_id = value;
                return;
            }
            StudentField::BankAccount => &mut record.bank_account,
            StudentField::BankCode => &mut record.bank_code,
            StudentField::AgencyNumber => &mut record.agency_number,
            StudentField::AccountNumber => &mut record.account_number,
            StudentField::TaxId => &mut record.tax_id,
            StudentField::BillingAddress => &mut record.billing_address,
            StudentField::BillingCity => &mut record.billing_city,
            StudentField::BillingState => &mut record.billing_state,
            StudentField::BillingZipCode => &mut record.billing_zip_code,
        };
        *slot = Some(value);
    }

    fn is_set(&self, record: &BulkStudentFinancialRecord) -> bool {
        match self {
            StudentField::StudentId => !record.student_id.is_empty(),
            StudentField::BankAccount => record.bank_account.is_some(),
            StudentField::BankCode => record.bank_code.is_some(),
            StudentField::AgencyNumber => record.agency_number.is_some(),
            StudentField::AccountNumber => record.account_number.is_some(),
            StudentField::TaxId => record.tax_id.is_some(),
            StudentField::BillingAddress => record.billing_address.is_some(),
            StudentField::BillingCity => record.billing_city.is_some(),
            StudentField::BillingState => record.billing_state.is_some(),
            StudentField::BillingZipCode => record.billing_zip_code.is_some(),
        }
    }
}

/// Columns of the scholarship template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScholarshipField {
    StudentId,
    ScholarshipId,
    StartDate,
    EndDate,
    DiscountPercentage,
}

impl ScholarshipField {
    pub const ALL: [ScholarshipField; 5] = [
        ScholarshipField::StudentId,
        ScholarshipField::ScholarshipId,
        ScholarshipField::StartDate,
        ScholarshipField::EndDate,
        ScholarshipField::DiscountPercentage,
    ];

    pub fn from_header(header: &str) -> Option<Self> {
        match header {
            "student_id" | "studentId" => Some(ScholarshipField::StudentId),
            "scholarship_id" | "scholarshipId" => Some(ScholarshipField::ScholarshipId),
            "start_date" | "startDate" => Some(ScholarshipField::StartDate),
            "end_date" | "endDate" => Some(ScholarshipField::EndDate),
            "discount_percentage" | "discountPercentage" => {
                Some(ScholarshipField::DiscountPercentage)
            }
            _ => None,
        }
    }

    pub fn header(&self) -> &'static str {
        match self {
            ScholarshipField::StudentId => "student_id",
            ScholarshipField::ScholarshipId => "scholarship_id",
            ScholarshipField::StartDate => "start_date",
            ScholarshipField::EndDate => "end_date",
            ScholarshipField::DiscountPercentage => "discount_percentage",
        }
    }
}

/// Values applied to scholarship rows whose file does not carry the column
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScholarshipDefaults {
    pub scholarship_id: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Header cells resolved to columns, plus the data rows with their line numbers
struct RawTable<F> {
    columns: Vec<Option<F>>,
    rows: Vec<(u64, StringRecord)>,
}

fn read_table<F: Copy + PartialEq>(
    text: &str,
    resolve: fn(&str) -> Option<F>,
    required: F,
) -> FinanceResult<RawTable<F>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .quoting(false)
        .trim(Trim::All)
        .flexible(false)
        .from_reader(text.trim().as_bytes());

    let headers = rdr.headers()?.clone();
    if headers.is_empty() || headers.iter().all(str::is_empty) {
        return Ok(RawTable {
            columns: Vec::new(),
            rows: Vec::new(),
        });
    }
    reject_quotes(1, &headers)?;

    let columns: Vec<Option<F>> = headers
        .iter()
        .map(|h| {
            let column = resolve(h);
            if column.is_none() {
                debug!(header = h, "ignoring unknown CSV column");
            }
            column
        })
        .collect();

    if !columns.iter().any(|c| *c == Some(required)) {
        return Err(FinanceError::MalformedRow {
            line: 1,
            reason: "header has no student_id column".to_string(),
        });
    }

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| match e.kind() {
            csv::ErrorKind::UnequalLengths {
                pos,
                expected_len,
                len,
            } => FinanceError::MalformedRow {
                line: pos.as_ref().map(|p| p.line()).unwrap_or(0),
                reason: format!("expected {} fields, found {}", expected_len, len),
            },
            _ => FinanceError::from(e),
        })?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        reject_quotes(line, &record)?;
        rows.push((line, record));
    }

    Ok(RawTable { columns, rows })
}

fn reject_quotes(line: u64, record: &StringRecord) -> FinanceResult<()> {
    if record.iter().any(|field| field.contains('"')) {
        return Err(FinanceError::MalformedRow {
            line,
            reason: "quoted values are not supported".to_string(),
        });
    }
    Ok(())
}

/// Value of the first non-empty cell mapped to `field`
fn cell<'r, F: Copy + PartialEq>(
    columns: &[Option<F>],
    record: &'r StringRecord,
    field: F,
) -> Option<&'r str> {
    columns
        .iter()
        .zip(record.iter())
        .find(|(column, value)| **column == Some(field) && !value.is_empty())
        .map(|(_, value)| value)
}

fn parse_date(line: u64, field: ScholarshipField, value: &str) -> FinanceResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| FinanceError::MalformedRow {
        line,
        reason: format!("{} '{}' is not a YYYY-MM-DD date", field.header(), value),
    })
}

/// Parse the student financial data template into records, in file order
pub fn parse_student_financial(text: &str) -> FinanceResult<Vec<BulkStudentFinancialRecord>> {
    let table = read_table(text, StudentField::from_header, StudentField::StudentId)?;

    let mut records = Vec::with_capacity(table.rows.len());
    for (line, row) in &table.rows {
        let mut record = BulkStudentFinancialRecord::default();
        for (column, value) in table.columns.iter().zip(row.iter()) {
            if let Some(field) = column {
                if !value.is_empty() && !field.is_set(&record) {
                    field.assign(&mut record, value.to_string());
                }
            }
        }

        if record.student_id.is_empty() {
            return Err(FinanceError::MalformedRow {
                line: *line,
                reason: "student_id is empty".to_string(),
            });
        }
        records.push(record);
    }

    Ok(records)
}

/// Parse the scholarship template into records, in file order
///
/// Columns absent from a row are taken from `defaults`. A missing or
/// unreadable discount percentage counts as zero.
pub fn parse_scholarships(
    text: &str,
    defaults: &ScholarshipDefaults,
) -> FinanceResult<Vec<BulkScholarshipRecord>> {
    let table = read_table(text, ScholarshipField::from_header, ScholarshipField::StudentId)?;
    let columns = &table.columns;

    let mut records = Vec::with_capacity(table.rows.len());
    for (line, row) in &table.rows {
        let line = *line;

        let student_id = cell(columns, row, ScholarshipField::StudentId)
            .ok_or_else(|| FinanceError::MalformedRow {
                line,
                reason: "student_id is empty".to_string(),
            })?
            .to_string();

        let scholarship_id = cell(columns, row, ScholarshipField::ScholarshipId)
            .map(str::to_string)
            .or_else(|| defaults.scholarship_id.clone());

        let start_date = match cell(columns, row, ScholarshipField::StartDate) {
            Some(value) => parse_date(line, ScholarshipField::StartDate, value)?,
            None => defaults.start_date.ok_or_else(|| FinanceError::MalformedRow {
                line,
                reason: "start_date is empty and no default was given".to_string(),
            })?,
        };

        let end_date = match cell(columns, row, ScholarshipField::EndDate) {
            Some(value) => Some(parse_date(line, ScholarshipField::EndDate, value)?),
            None => defaults.end_date,
        };
        if let Some(end) = end_date {
            if end < start_date {
                return Err(FinanceError::MalformedRow {
                    line,
                    reason: format!("end_date {} is before start_date {}", end, start_date),
                });
            }
        }

        let discount_percentage = cell(columns, row, ScholarshipField::DiscountPercentage)
            .and_then(|value| match value.replace(',', ".").parse::<BigDecimal>() {
                Ok(parsed) => Some(parsed),
                Err(_) => {
                    debug!(line, value, "unreadable discount_percentage, using 0");
                    None
                }
            })
            .unwrap_or_else(|| BigDecimal::from(0));
        validate_percentage("discount_percentage", &discount_percentage).map_err(|e| {
            FinanceError::MalformedRow {
                line,
                reason: e.to_string(),
            }
        })?;

        records.push(BulkScholarshipRecord {
            student_id,
            scholarship_id,
            start_date,
            end_date,
            discount_percentage,
        });
    }

    Ok(records)
}

fn finish(writer: csv::Writer<Vec<u8>>) -> FinanceResult<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| FinanceError::Csv(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| FinanceError::Csv(e.to_string()))
}

/// Serialize student records with the canonical header row
pub fn write_student_financial_csv(
    records: &[BulkStudentFinancialRecord],
) -> FinanceResult<String> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    writer.write_record(StudentField::ALL.iter().map(|f| f.header()))?;
    for record in records {
        writer.serialize(record)?;
    }
    finish(writer)
}

/// Serialize scholarship records with the canonical header row
pub fn write_scholarship_csv(records: &[BulkScholarshipRecord]) -> FinanceResult<String> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    writer.write_record(ScholarshipField::ALL.iter().map(|f| f.header()))?;
    for record in records {
        writer.serialize(record)?;
    }
    finish(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_student_rows_accept_both_spellings() {
        let csv = "studentId,bank_code,billingCity\nst-1,001,Recife\nst-2,,Natal\n";
        let records = parse_student_financial(csv).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].student_id, "st-1");
        assert_eq!(records[0].bank_code.as_deref(), Some("001"));
        assert_eq!(records[0].billing_city.as_deref(), Some("Recife"));
        assert_eq!(records[1].bank_code, None);
        assert_eq!(records[1].tax_id, None);
    }

    #[test]
    fn test_unknown_columns_are_ignored() {
        let csv = "student_id,nickname\nst-1,Zeca\n";
        let records = parse_student_financial(csv).unwrap();
        assert_eq!(records, vec![BulkStudentFinancialRecord::new("st-1")]);
    }

    #[test]
    fn test_crlf_and_padding() {
        let csv = " student_id , tax_id \r\n st-9 , 123.456.789-00 \r\n";
        let records = parse_student_financial(csv).unwrap();
        assert_eq!(records[0].student_id, "st-9");
        assert_eq!(records[0].tax_id.as_deref(), Some("123.456.789-00"));
    }

    #[test]
    fn test_field_count_mismatch_is_rejected() {
        let csv = "student_id,tax_id\nst-1,111\nst-2,222,extra\n";
        match parse_student_financial(csv) {
            Err(FinanceError::MalformedRow { line, reason }) => {
                assert_eq!(line, 3);
                assert!(reason.contains("expected 2 fields, found 3"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_quotes_are_rejected() {
        let csv = "student_id,billing_address\nst-1,\"Rua A\"\n";
        assert!(matches!(
            parse_student_financial(csv),
            Err(FinanceError::MalformedRow { line: 2, .. })
        ));
    }

    #[test]
    fn test_missing_student_id() {
        let csv = "student_id,tax_id\n,111\n";
        assert!(matches!(
            parse_student_financial(csv),
            Err(FinanceError::MalformedRow { line: 2, .. })
        ));

        let csv = "tax_id\n111\n";
        assert!(matches!(
            parse_student_financial(csv),
            Err(FinanceError::MalformedRow { line: 1, .. })
        ));
    }

    #[test]
    fn test_empty_input_yields_no_records() {
        assert!(parse_student_financial("").unwrap().is_empty());
        assert!(parse_student_financial("student_id,tax_id\n").unwrap().is_empty());
    }

    #[test]
    fn test_scholarship_defaults_fill_missing_columns() {
        let defaults = ScholarshipDefaults {
            scholarship_id: Some("bolsa001".to_string()),
            start_date: Some(date(2025, 2, 1)),
            end_date: Some(date(2025, 12, 31)),
        };
        let csv = "student_id,discount_percentage,end_date\nabc123,50,\nxyz789,25.5,2025-06-30\n";
        let records = parse_scholarships(csv, &defaults).unwrap();

        assert_eq!(records[0].scholarship_id.as_deref(), Some("bolsa001"));
        assert_eq!(records[0].start_date, date(2025, 2, 1));
        assert_eq!(records[0].end_date, Some(date(2025, 12, 31)));
        assert_eq!(records[1].end_date, Some(date(2025, 6, 30)));
        assert_eq!(
            records[1].discount_percentage,
            BigDecimal::from_str("25.5").unwrap()
        );
    }

    #[test]
    fn test_unreadable_discount_defaults_to_zero() {
        let csv = "student_id,start_date,discount_percentage\na,2025-01-01,lots\nb,2025-01-01,\n";
        let records = parse_scholarships(csv, &ScholarshipDefaults::default()).unwrap();
        assert_eq!(records[0].discount_percentage, BigDecimal::from(0));
        assert_eq!(records[1].discount_percentage, BigDecimal::from(0));
    }

    #[test]
    fn test_scholarship_rejections() {
        let defaults = ScholarshipDefaults::default();

        let no_start = "student_id,discount_percentage\na,10\n";
        assert!(parse_scholarships(no_start, &defaults).is_err());

        let bad_date = "student_id,start_date\na,01/02/2025\n";
        assert!(parse_scholarships(bad_date, &defaults).is_err());

        let inverted = "student_id,start_date,end_date\na,2025-03-01,2025-02-01\n";
        assert!(parse_scholarships(inverted, &defaults).is_err());

        let too_much = "student_id,start_date,discount_percentage\na,2025-03-01,150\n";
        assert!(matches!(
            parse_scholarships(too_much, &defaults),
            Err(FinanceError::MalformedRow { line: 2, .. })
        ));
    }

    #[test]
    fn test_written_header_is_canonical() {
        let out = write_student_financial_csv(&[]).unwrap();
        assert_eq!(
            out.trim_end(),
            "student_id,bank_account,bank_code,agency_number,account_number,tax_id,billing_address,billing_city,billing_state,billing_zip_code"
        );
    }

    fn safe_value() -> impl Strategy<Value = String> {
        "[A-Za-z0-9][A-Za-z0-9 ./-]{0,10}[A-Za-z0-9]"
    }

    proptest! {
        #[test]
        fn prop_student_rows_survive_reserialization(
            rows in proptest::collection::vec(
                (safe_value(), proptest::option::of(safe_value()), proptest::option::of(safe_value())),
                1..8,
            )
        ) {
            let records: Vec<BulkStudentFinancialRecord> = rows
                .into_iter()
                .map(|(id, tax, city)| BulkStudentFinancialRecord {
                    student_id: id,
                    tax_id: tax,
                    billing_city: city,
                    ..Default::default()
                })
                .collect();

            let text = write_student_financial_csv(&records).unwrap();
            let parsed = parse_student_financial(&text).unwrap();
            prop_assert_eq!(parsed, records);
        }

        #[test]
        fn prop_scholarship_rows_survive_reserialization(
            rows in proptest::collection::vec(
                (
                    safe_value(),
                    proptest::option::of(safe_value()),
                    0i64..3650,
                    proptest::option::of(0i64..730),
                    0i64..=10_000,
                ),
                1..8,
            )
        ) {
            let records: Vec<BulkScholarshipRecord> = rows
                .into_iter()
                .map(|(id, scholarship, start, length, hundredths)| {
                    let start_date = date(2020, 1, 1) + chrono::Duration::days(start);
                    BulkScholarshipRecord {
                        student_id: id,
                        scholarship_id: scholarship,
                        start_date,
                        end_date: length.map(|days| start_date + chrono::Duration::days(days)),
                        discount_percentage: BigDecimal::new(hundredths.into(), 2),
                    }
                })
                .collect();

            let text = write_scholarship_csv(&records).unwrap();
            let parsed = parse_scholarships(&text, &ScholarshipDefaults::default()).unwrap();
            prop_assert_eq!(parsed, records);
        }
    }
}
