//! Bulk CSV imports: parsing, submission and result presentation

pub mod orchestrator;
pub mod parser;
pub mod results;
pub mod template;

pub use orchestrator::*;
pub use parser::*;
pub use results::*;
pub use template::*;

use serde::Serialize;

use crate::types::*;

/// The two bulk import templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ImportKind {
    #[serde(rename = "students")]
    StudentFinancial,
    #[serde(rename = "scholarships")]
    Scholarship,
}

impl std::str::FromStr for ImportKind {
    type Err = FinanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "students" | "student_financial" => Ok(ImportKind::StudentFinancial),
            "scholarships" | "scholarship" => Ok(ImportKind::Scholarship),
            other => Err(FinanceError::InvalidField {
                field: "import kind".to_string(),
                reason: format!("'{}' is neither 'students' nor 'scholarships'", other),
            }),
        }
    }
}

/// Parsed rows of one import file
#[derive(Debug, Clone, PartialEq)]
pub enum ImportBatch {
    StudentFinancial(Vec<BulkStudentFinancialRecord>),
    Scholarship(Vec<BulkScholarshipRecord>),
}

impl ImportBatch {
    /// Parse `text` as the given template
    pub fn parse(
        kind: ImportKind,
        text: &str,
        defaults: &ScholarshipDefaults,
    ) -> FinanceResult<Self> {
        Ok(match kind {
            ImportKind::StudentFinancial => {
                ImportBatch::StudentFinancial(parse_student_financial(text)?)
            }
            ImportKind::Scholarship => ImportBatch::Scholarship(parse_scholarships(text, defaults)?),
        })
    }

    pub fn kind(&self) -> ImportKind {
        match self {
            ImportBatch::StudentFinancial(_) => ImportKind::StudentFinancial,
            ImportBatch::Scholarship(_) => ImportKind::Scholarship,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ImportBatch::StudentFinancial(rows) => rows.len(),
            ImportBatch::Scholarship(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Correlation key of each row: student id plus scholarship id when present
    pub fn row_keys(&self) -> Vec<(&str, Option<&str>)> {
        match self {
            ImportBatch::StudentFinancial(rows) => {
                rows.iter().map(|r| (r.student_id.as_str(), None)).collect()
            }
            ImportBatch::Scholarship(rows) => rows
                .iter()
                .map(|r| (r.student_id.as_str(), r.scholarship_id.as_deref()))
                .collect(),
        }
    }
}
