//! Late-fee assessment and amount-due computation
//!
//! Nothing here is cached. An overdue slip accrues every day, so the amount
//! due has to be assessed again each time it is displayed or used as a
//! payment default. Paid slips are the exception: their final amount is fixed
//! by the settlement.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::str::FromStr;
use tracing::debug;

use crate::config::PlatformConfig;
use crate::traits::*;
use crate::types::*;
use crate::utils::money::round_currency;
use crate::utils::validation::validate_rate;

/// Interest rate per period applied when the slip carries none
pub const DEFAULT_INTEREST_RATE: &str = "0.02";
/// One-off late fee rate
pub const DEFAULT_LATE_FEE_RATE: &str = "0.05";

pub(crate) fn default_rate(literal: &str) -> BigDecimal {
    BigDecimal::from_str(literal).unwrap_or_else(|_| BigDecimal::from(0))
}

/// Computes late fees through the platform
pub struct FeeCalculator<P: FinancialPlatform> {
    platform: P,
    interest_rate: BigDecimal,
    late_fee_rate: BigDecimal,
}

impl<P: FinancialPlatform> FeeCalculator<P> {
    /// Create a calculator with the default 2% interest and 5% late fee
    pub fn new(platform: P) -> Self {
        Self {
            platform,
            interest_rate: default_rate(DEFAULT_INTEREST_RATE),
            late_fee_rate: default_rate(DEFAULT_LATE_FEE_RATE),
        }
    }

    /// Create a calculator with explicit rates
    pub fn with_rates(
        platform: P,
        interest_rate: BigDecimal,
        late_fee_rate: BigDecimal,
    ) -> FinanceResult<Self> {
        validate_rate("interest_rate", &interest_rate)?;
        validate_rate("late_fee_rate", &late_fee_rate)?;
        Ok(Self {
            platform,
            interest_rate,
            late_fee_rate,
        })
    }

    /// Create a calculator with the rates from configuration
    pub fn from_config(platform: P, config: &PlatformConfig) -> FinanceResult<Self> {
        Self::with_rates(
            platform,
            config.default_interest_rate.clone(),
            config.default_late_fee_rate.clone(),
        )
    }

    pub fn interest_rate(&self) -> &BigDecimal {
        &self.interest_rate
    }

    pub fn late_fee_rate(&self) -> &BigDecimal {
        &self.late_fee_rate
    }

    /// Assess accrued charges on `amount` as of `today`
    pub async fn assess(
        &self,
        amount: &BigDecimal,
        due_date: NaiveDate,
        today: NaiveDate,
    ) -> FinanceResult<FeeBreakdown> {
        self.assess_at_rate(amount, due_date, today, &self.interest_rate)
            .await
    }

    async fn assess_at_rate(
        &self,
        amount: &BigDecimal,
        due_date: NaiveDate,
        today: NaiveDate,
        interest_rate: &BigDecimal,
    ) -> FinanceResult<FeeBreakdown> {
        if today <= due_date {
            return Ok(FeeBreakdown::not_due(amount));
        }

        let request = FeeRequest {
            original_amount: amount.clone(),
            due_date,
            interest_rate: interest_rate.clone(),
            late_fee_rate: self.late_fee_rate.clone(),
        };
        let fees = self.platform.calculate_late_fees(&request).await?;
        debug!(
            %due_date,
            late_fee = %fees.late_fee,
            interest = %fees.interest,
            total = %fees.total_amount,
            "late fees assessed"
        );
        Ok(fees)
    }

    /// Amount payable on `slip` as of `today`
    ///
    /// Before the due date this is the original amount net of the discount.
    /// After it the discount no longer applies and late fee and interest are
    /// added. A paid slip returns its settled final amount without calling
    /// the platform.
    pub async fn amount_due(&self, slip: &BankSlip, today: NaiveDate) -> FinanceResult<BigDecimal> {
        match slip.status {
            BankSlipStatus::Paid => return Ok(slip.final_amount.clone()),
            BankSlipStatus::Canceled => {
                return Err(FinanceError::SlipNotPayable {
                    id: slip.id.clone(),
                    status: slip.status,
                })
            }
            BankSlipStatus::Pending | BankSlipStatus::Overdue => {}
        }

        if today <= slip.due_date {
            let net = &slip.amount - &slip.discount_amount;
            return Ok(round_currency(&net.max(BigDecimal::from(0))));
        }

        let rate = if slip.interest_rate > BigDecimal::from(0) {
            &slip.interest_rate
        } else {
            &self.interest_rate
        };
        let fees = self
            .assess_at_rate(&slip.amount, slip.due_date, today, rate)
            .await?;
        Ok(round_currency(&fees.total_amount))
    }
}
