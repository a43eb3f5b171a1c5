//! Presentation of bulk operation results

use serde::Serialize;
use std::fmt::Write;

use crate::bulk::ImportKind;
use crate::types::*;

/// One rendered result row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultLine {
    pub label: String,
    pub ok: bool,
    pub error_message: Option<String>,
}

/// Rendered outcome of one bulk submission, one line per returned result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultView {
    pub kind: ImportKind,
    pub lines: Vec<ResultLine>,
    pub succeeded: usize,
    pub failed: usize,
}

impl ResultView {
    pub fn from_results(kind: ImportKind, results: &[BulkOperationResult]) -> Self {
        let lines: Vec<ResultLine> = results
            .iter()
            .map(|result| ResultLine {
                label: match kind {
                    ImportKind::StudentFinancial => format!("Student: {}", result.student_id),
                    ImportKind::Scholarship => format!(
                        "Student: {} - Scholarship: {}",
                        result.student_id,
                        result.scholarship_id.as_deref().unwrap_or("-")
                    ),
                },
                ok: result.is_success(),
                error_message: result.error_message.clone(),
            })
            .collect();

        let succeeded = lines.iter().filter(|l| l.ok).count();
        Self {
            kind,
            failed: lines.len() - succeeded,
            succeeded,
            lines,
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Short summary line
    pub fn headline(&self) -> String {
        format!(
            "{} rows processed: {} succeeded, {} failed",
            self.lines.len(),
            self.succeeded,
            self.failed
        )
    }

    /// Plain-text rendering, one row per line
    pub fn render(&self) -> String {
        let mut out = self.headline();
        out.push('\n');
        for line in &self.lines {
            let mark = if line.ok { "OK " } else { "ERR" };
            let _ = match &line.error_message {
                Some(message) if !line.ok => writeln!(out, "[{}] {}: {}", mark, line.label, message),
                _ => writeln!(out, "[{}] {}", mark, line.label),
            };
        }
        out
    }
}
