//! Settlement of individual bank slips

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::slips::fees::FeeCalculator;
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::validate_positive_amount;

/// Pre-filled settlement form for one slip
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentForm {
    pub slip_id: String,
    /// Amount due at the time the form was prepared
    pub payment_amount: BigDecimal,
    pub payment_date: DateTime<Utc>,
}

/// Confirmed settlement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentReceipt {
    pub outcome: PaymentOutcome,
    pub payment_date: DateTime<Utc>,
    /// The slip as read back after settlement
    pub slip: Option<BankSlip>,
}

impl PaymentReceipt {
    pub fn transaction_id(&self) -> Option<&str> {
        self.outcome.transaction_id.as_deref()
    }
}

/// Records payments against slips through the platform
pub struct PaymentProcessor<P: FinancialPlatform> {
    platform: P,
    fees: FeeCalculator<P>,
}

impl<P: FinancialPlatform + Clone> PaymentProcessor<P> {
    pub fn new(platform: P) -> Self {
        let fees = FeeCalculator::new(platform.clone());
        Self { platform, fees }
    }
}

impl<P: FinancialPlatform> PaymentProcessor<P> {
    /// Create a processor whose form defaults come from `fees`
    pub fn with_fees(platform: P, fees: FeeCalculator<P>) -> Self {
        Self { platform, fees }
    }

    /// Build a settlement form defaulting to the amount due as of `today`
    pub async fn prepare(&self, slip: &BankSlip, today: NaiveDate) -> FinanceResult<PaymentForm> {
        ensure_payable(slip)?;
        let payment_amount = self.fees.amount_due(slip, today).await?;
        Ok(PaymentForm {
            slip_id: slip.id.clone(),
            payment_amount,
            payment_date: Utc::now(),
        })
    }

    /// Submit a prepared form
    pub async fn submit(&self, form: &PaymentForm) -> FinanceResult<PaymentReceipt> {
        self.process(&form.slip_id, &form.payment_amount, Some(form.payment_date))
            .await
    }

    /// Record a payment of `amount` against `slip_id`
    ///
    /// The platform decides whether the slip can be settled. A refusal is
    /// returned as `PaymentRejected` carrying the platform message unchanged.
    pub async fn process(
        &self,
        slip_id: &str,
        amount: &BigDecimal,
        payment_date: Option<DateTime<Utc>>,
    ) -> FinanceResult<PaymentReceipt> {
        if slip_id.trim().is_empty() {
            return Err(FinanceError::MissingField("slip_id".to_string()));
        }
        validate_positive_amount("payment_amount", amount)?;
        let payment_date = payment_date.unwrap_or_else(Utc::now);

        info!(slip_id, %amount, %payment_date, "processing bank slip payment");
        let outcome = self
            .platform
            .process_bank_slip_payment(slip_id, amount, payment_date)
            .await
            .map_err(|e| {
                error!(slip_id, error = %e, "payment call failed");
                e
            })?;

        if !outcome.success {
            warn!(slip_id, message = %outcome.message, "payment rejected by platform");
            return Err(FinanceError::PaymentRejected(outcome.message));
        }

        let slip = self.platform.get_bank_slip(slip_id).await?;
        match &slip {
            Some(s) if s.is_paid() => {}
            Some(s) => warn!(slip_id, status = %s.status, "slip not marked paid after settlement"),
            None => warn!(slip_id, "slip not found after settlement"),
        }

        info!(
            slip_id,
            transaction_id = outcome.transaction_id.as_deref().unwrap_or("-"),
            "payment recorded"
        );
        Ok(PaymentReceipt {
            outcome,
            payment_date,
            slip,
        })
    }

    /// Record a payment against a slip already in hand
    ///
    /// Refuses slips that are paid or canceled without calling the platform.
    pub async fn settle(
        &self,
        slip: &BankSlip,
        amount: &BigDecimal,
        payment_date: Option<DateTime<Utc>>,
    ) -> FinanceResult<PaymentReceipt> {
        ensure_payable(slip)?;
        self.process(&slip.id, amount, payment_date).await
    }
}

fn ensure_payable(slip: &BankSlip) -> FinanceResult<()> {
    if slip.status.is_payable() {
        Ok(())
    } else {
        Err(FinanceError::SlipNotPayable {
            id: slip.id.clone(),
            status: slip.status,
        })
    }
}
