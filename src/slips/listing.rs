//! Filtering of the slip listing

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::*;

/// Operator filters over the slip listing; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlipFilter {
    pub status: Option<BankSlipStatus>,
    /// Case-insensitive substring of the slip id or student id
    pub search: Option<String>,
    pub due_from: Option<NaiveDate>,
    pub due_to: Option<NaiveDate>,
}

impl SlipFilter {
    pub fn with_status(mut self, status: BankSlipStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn due_between(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.due_from = from;
        self.due_to = to;
        self
    }

    pub fn matches(&self, slip: &BankSlip) -> bool {
        if let Some(status) = self.status {
            if slip.status != status {
                return false;
            }
        }

        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            if !slip.id.to_lowercase().contains(&needle)
                && !slip.student_id.to_lowercase().contains(&needle)
            {
                return false;
            }
        }

        if let Some(from) = self.due_from {
            if slip.due_date < from {
                return false;
            }
        }
        if let Some(to) = self.due_to {
            if slip.due_date > to {
                return false;
            }
        }

        true
    }

    /// Matching slips, in input order
    pub fn apply<'a>(&self, slips: &'a [BankSlip]) -> Vec<&'a BankSlip> {
        slips.iter().filter(|s| self.matches(s)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;

    fn slip(id: &str, student: &str, day: u32, status: BankSlipStatus) -> BankSlip {
        let mut slip = BankSlip::new(
            id.to_string(),
            student.to_string(),
            BigDecimal::from(100),
            NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
            None,
        );
        slip.status = status;
        slip
    }

    fn sample() -> Vec<BankSlip> {
        vec![
            slip("AB-1", "maria", 20, BankSlipStatus::Pending),
            slip("ab-2", "joao", 10, BankSlipStatus::Paid),
            slip("cd-3", "Mariana", 5, BankSlipStatus::Overdue),
        ]
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        let slips = sample();
        assert_eq!(SlipFilter::default().apply(&slips).len(), 3);
    }

    #[test]
    fn test_search_is_case_insensitive_on_both_ids() {
        let slips = sample();
        let ids: Vec<&str> = SlipFilter::default()
            .with_search("MARI")
            .apply(&slips)
            .into_iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(ids, vec!["AB-1", "cd-3"]);

        let by_slip = SlipFilter::default().with_search("ab-").apply(&slips);
        assert_eq!(by_slip.len(), 2);
    }

    #[test]
    fn test_status_and_inclusive_due_range() {
        let slips = sample();
        let from = NaiveDate::from_ymd_opt(2025, 3, 5);
        let to = NaiveDate::from_ymd_opt(2025, 3, 10);

        let in_range = SlipFilter::default().due_between(from, to).apply(&slips);
        assert_eq!(in_range.len(), 2);

        let paid = SlipFilter::default()
            .due_between(from, to)
            .with_status(BankSlipStatus::Paid)
            .apply(&slips);
        assert_eq!(paid.len(), 1);
        assert_eq!(paid[0].id, "ab-2");
    }
}
