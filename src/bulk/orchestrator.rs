//! Bulk submission: one remote call per submission, one result per row

use tracing::{error, info, warn};

use crate::bulk::{ImportBatch, ImportKind, ResultView, ScholarshipDefaults};
use crate::traits::*;
use crate::types::*;

/// Callback fired after every successful submission, e.g. to refresh a listing
pub type CompletionHook = Box<dyn Fn(ImportKind, &[BulkOperationResult]) + Send + Sync>;

/// Submits parsed import files and holds the latest result list
pub struct BulkImporter<P: FinancialPlatform> {
    platform: P,
    results: Vec<BulkOperationResult>,
    last_kind: Option<ImportKind>,
    on_complete: Option<CompletionHook>,
}

impl<P: FinancialPlatform> BulkImporter<P> {
    /// Create a new importer over the given platform client
    pub fn new(platform: P) -> Self {
        Self {
            platform,
            results: Vec::new(),
            last_kind: None,
            on_complete: None,
        }
    }

    /// Register a callback run after each successful submission
    pub fn with_completion_hook(mut self, hook: CompletionHook) -> Self {
        self.on_complete = Some(hook);
        self
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Results of the last successful submission
    pub fn results(&self) -> &[BulkOperationResult] {
        &self.results
    }

    /// View of the last successful submission, if any
    pub fn view(&self) -> Option<ResultView> {
        self.last_kind
            .map(|kind| ResultView::from_results(kind, &self.results))
    }

    /// Submit student financial rows
    pub async fn submit_student_financial(
        &mut self,
        records: &[BulkStudentFinancialRecord],
    ) -> FinanceResult<&[BulkOperationResult]> {
        if records.is_empty() {
            warn!("student financial import has no rows; nothing submitted");
            return Err(FinanceError::NothingToProcess);
        }

        info!(rows = records.len(), "submitting student financial data");
        let results = self
            .platform
            .bulk_register_student_financial_data(records)
            .await
            .map_err(|e| {
                error!(rows = records.len(), error = %e, "student financial import failed");
                e
            })?;

        Ok(self.store(ImportKind::StudentFinancial, records.len(), results))
    }

    /// Submit scholarship assignment rows
    pub async fn submit_scholarships(
        &mut self,
        records: &[BulkScholarshipRecord],
    ) -> FinanceResult<&[BulkOperationResult]> {
        if records.is_empty() {
            warn!("scholarship import has no rows; nothing submitted");
            return Err(FinanceError::NothingToProcess);
        }

        info!(rows = records.len(), "submitting scholarship assignments");
        let results = self
            .platform
            .bulk_register_scholarship_students(records)
            .await
            .map_err(|e| {
                error!(rows = records.len(), error = %e, "scholarship import failed");
                e
            })?;

        Ok(self.store(ImportKind::Scholarship, records.len(), results))
    }

    /// Submit an already parsed import file
    pub async fn submit(&mut self, batch: &ImportBatch) -> FinanceResult<&[BulkOperationResult]> {
        match batch {
            ImportBatch::StudentFinancial(rows) => self.submit_student_financial(rows).await,
            ImportBatch::Scholarship(rows) => self.submit_scholarships(rows).await,
        }
    }

    /// Parse `text` as the given template and submit it
    pub async fn import_csv(
        &mut self,
        kind: ImportKind,
        text: &str,
        defaults: &ScholarshipDefaults,
    ) -> FinanceResult<&[BulkOperationResult]> {
        let batch = ImportBatch::parse(kind, text, defaults).map_err(|e| {
            warn!(?kind, error = %e, "import file rejected");
            e
        })?;
        self.submit(&batch).await
    }

    fn store(
        &mut self,
        kind: ImportKind,
        submitted: usize,
        results: Vec<BulkOperationResult>,
    ) -> &[BulkOperationResult] {
        if results.len() != submitted {
            warn!(
                ?kind,
                submitted,
                returned = results.len(),
                "platform returned a different number of results than rows submitted"
            );
        }

        let failed = results.iter().filter(|r| !r.is_success()).count();
        info!(
            ?kind,
            rows = results.len(),
            succeeded = results.len() - failed,
            failed,
            "bulk import finished"
        );

        self.results = results;
        self.last_kind = Some(kind);
        if let Some(hook) = &self.on_complete {
            hook(kind, &self.results);
        }
        &self.results
    }
}

/// Results of a submission attributed back to the rows that produced them
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Reconciliation {
    /// Input row index paired with its result, in input order
    pub matched: Vec<(usize, BulkOperationResult)>,
    /// Input rows no result could be attributed to
    pub missing: Vec<usize>,
    /// Results that match no remaining input row
    pub unexpected: Vec<BulkOperationResult>,
}

impl Reconciliation {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty()
    }
}

/// Attribute results to input rows by student id, and by scholarship id when
/// both sides carry one. Duplicate keys pair off in input order.
pub fn reconcile(batch: &ImportBatch, results: &[BulkOperationResult]) -> Reconciliation {
    let keys = batch.row_keys();
    let mut consumed = vec![false; keys.len()];
    let mut reconciliation = Reconciliation::default();

    for result in results {
        let position = keys.iter().enumerate().position(|(i, (student, scholarship))| {
            !consumed[i]
                && *student == result.student_id
                && match (scholarship, result.scholarship_id.as_deref()) {
                    (Some(expected), Some(reported)) => *expected == reported,
                    _ => true,
                }
        });

        match position {
            Some(i) => {
                consumed[i] = true;
                reconciliation.matched.push((i, result.clone()));
            }
            None => reconciliation.unexpected.push(result.clone()),
        }
    }

    reconciliation.matched.sort_by_key(|(i, _)| *i);
    reconciliation.missing = consumed
        .iter()
        .enumerate()
        .filter(|(_, used)| !**used)
        .map(|(i, _)| i)
        .collect();
    reconciliation
}
