//! Downloadable CSV templates for bulk imports

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::bulk::parser::{write_scholarship_csv, write_student_financial_csv};
use crate::bulk::ImportKind;
use crate::types::*;

/// A template file: header row plus one example row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvTemplate {
    kind: ImportKind,
}

impl CsvTemplate {
    pub fn new(kind: ImportKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> ImportKind {
        self.kind
    }

    /// Suggested file name for the download
    pub fn file_name(&self) -> &'static str {
        match self.kind {
            ImportKind::StudentFinancial => "template_students.csv",
            ImportKind::Scholarship => "template_scholarships.csv",
        }
    }

    /// Template contents
    pub fn contents(&self) -> FinanceResult<String> {
        match self.kind {
            ImportKind::StudentFinancial => write_student_financial_csv(&[example_student()]),
            ImportKind::Scholarship => write_scholarship_csv(&[example_scholarship()]),
        }
    }

    /// Save the template into `dir` and return the written path
    pub fn write_to(&self, dir: &Path) -> FinanceResult<PathBuf> {
        let path = dir.join(self.file_name());
        std::fs::write(&path, self.contents()?).map_err(|e| FinanceError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        info!(path = %path.display(), "CSV template written");
        Ok(path)
    }
}

fn example_student() -> BulkStudentFinancialRecord {
    BulkStudentFinancialRecord {
        student_id: "exemplo123".to_string(),
        bank_account: Some("12345-6".to_string()),
        bank_code: Some("001".to_string()),
        agency_number: Some("1234".to_string()),
        account_number: Some("567890-1".to_string()),
        tax_id: Some("123.456.789-00".to_string()),
        billing_address: Some("Rua Exemplo 123".to_string()),
        billing_city: Some("São Paulo".to_string()),
        billing_state: Some("SP".to_string()),
        billing_zip_code: Some("01234-567".to_string()),
    }
}

fn example_scholarship() -> BulkScholarshipRecord {
    BulkScholarshipRecord {
        student_id: "exemplo123".to_string(),
        scholarship_id: Some("bolsa001".to_string()),
        start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or(NaiveDate::MIN),
        end_date: NaiveDate::from_ymd_opt(2024, 12, 31),
        discount_percentage: BigDecimal::new(5000.into(), 2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bulk::parser::{parse_scholarships, parse_student_financial, ScholarshipDefaults};

    #[test]
    fn test_student_template_contents() {
        let template = CsvTemplate::new(ImportKind::StudentFinancial);
        let contents = template.contents().unwrap();
        let mut lines = contents.lines();

        assert_eq!(
            lines.next(),
            Some("student_id,bank_account,bank_code,agency_number,account_number,tax_id,billing_address,billing_city,billing_state,billing_zip_code")
        );
        assert_eq!(
            lines.next(),
            Some("exemplo123,12345-6,001,1234,567890-1,123.456.789-00,Rua Exemplo 123,São Paulo,SP,01234-567")
        );
        assert_eq!(lines.next(), None);
        assert_eq!(template.file_name(), "template_students.csv");
    }

    #[test]
    fn test_scholarship_template_contents() {
        let contents = CsvTemplate::new(ImportKind::Scholarship).contents().unwrap();
        assert_eq!(
            contents.lines().nth(1),
            Some("exemplo123,bolsa001,2024-01-01,2024-12-31,50.00")
        );
    }

    #[test]
    fn test_templates_parse_back() {
        let students = CsvTemplate::new(ImportKind::StudentFinancial).contents().unwrap();
        assert_eq!(parse_student_financial(&students).unwrap(), vec![example_student()]);

        let scholarships = CsvTemplate::new(ImportKind::Scholarship).contents().unwrap();
        let parsed = parse_scholarships(&scholarships, &ScholarshipDefaults::default()).unwrap();
        assert_eq!(parsed, vec![example_scholarship()]);
    }

    #[test]
    fn test_write_to_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = CsvTemplate::new(ImportKind::Scholarship)
            .write_to(dir.path())
            .unwrap();
        assert!(path.ends_with("template_scholarships.csv"));
        assert!(std::fs::read_to_string(path).unwrap().starts_with("student_id,"));
    }

    #[test]
    fn test_write_failure_is_not_a_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no-such-dir");
        let err = CsvTemplate::new(ImportKind::StudentFinancial)
            .write_to(&missing)
            .unwrap_err();
        assert!(matches!(err, FinanceError::Io { .. }));
        assert!(!err.is_client_side());
    }
}
