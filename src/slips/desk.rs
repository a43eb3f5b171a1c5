//! Bank slip desk that coordinates generation, listing and settlement

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};

use crate::config::PlatformConfig;
use crate::slips::{
    BatchForm, BatchGenerator, BatchRequest, FeeCalculator, PaymentForm, PaymentProcessor,
    PaymentReceipt, SlipFilter,
};
use crate::traits::*;
use crate::types::*;

/// Back-office entry point for everything bank slip related
pub struct BankSlipDesk<P: FinancialPlatform> {
    platform: P,
    generator: BatchGenerator<P>,
    payments: PaymentProcessor<P>,
    fees: FeeCalculator<P>,
}

impl<P: FinancialPlatform + Clone> BankSlipDesk<P> {
    /// Create a desk with the default rates and recipient gate
    pub fn new(platform: P) -> Self {
        Self {
            generator: BatchGenerator::new(platform.clone()),
            payments: PaymentProcessor::new(platform.clone()),
            fees: FeeCalculator::new(platform.clone()),
            platform,
        }
    }

    /// Create a desk with the rates from configuration
    pub fn from_config(platform: P, config: &PlatformConfig) -> FinanceResult<Self> {
        Ok(Self {
            generator: BatchGenerator::new(platform.clone()),
            payments: PaymentProcessor::with_fees(
                platform.clone(),
                FeeCalculator::from_config(platform.clone(), config)?,
            ),
            fees: FeeCalculator::from_config(platform.clone(), config)?,
            platform,
        })
    }

    /// Replace the recipient selection rules
    pub fn with_validator(mut self, validator: Box<dyn RecipientValidator>) -> Self {
        self.generator = BatchGenerator::with_validator(self.platform.clone(), validator);
        self
    }

    // Generation
    pub async fn eligible_recipients(&self) -> FinanceResult<Vec<DirectoryUser>> {
        self.generator.eligible_recipients().await
    }

    pub async fn generate(&self, request: &BatchRequest) -> FinanceResult<BatchId> {
        self.generator.generate(request).await
    }

    /// Check and submit the operator's generation form
    pub async fn generate_from_form(&self, form: BatchForm) -> FinanceResult<BatchId> {
        let request = form.into_request()?;
        self.generator.generate(&request).await
    }

    pub async fn send_batch(&self, batch_id: &BatchId, email_template: &str) -> FinanceResult<()> {
        self.generator.send_batch(batch_id, email_template).await
    }

    // Listing
    /// Slips matching `filter`, most distant due date first
    pub async fn list(&self, filter: &SlipFilter) -> FinanceResult<Vec<BankSlip>> {
        let slips = self.platform.list_bank_slips().await?;
        Ok(slips.into_iter().filter(|s| filter.matches(s)).collect())
    }

    /// Listing paired with each slip's current amount due; `None` for canceled slips.
    /// Any fee assessment failure fails the whole listing.
    pub async fn list_with_amount_due(
        &self,
        filter: &SlipFilter,
        today: NaiveDate,
    ) -> FinanceResult<Vec<(BankSlip, Option<BigDecimal>)>> {
        let slips = self.list(filter).await?;
        let mut rows = Vec::with_capacity(slips.len());
        for slip in slips {
            let due = match self.fees.amount_due(&slip, today).await {
                Ok(due) => Some(due),
                Err(FinanceError::SlipNotPayable { .. }) => None,
                Err(e) => return Err(e),
            };
            rows.push((slip, due));
        }
        Ok(rows)
    }

    pub async fn get(&self, slip_id: &str) -> FinanceResult<BankSlip> {
        self.platform
            .get_bank_slip(slip_id)
            .await?
            .ok_or_else(|| FinanceError::SlipNotFound(slip_id.to_string()))
    }

    // Fees and settlement
    pub async fn amount_due(&self, slip: &BankSlip, today: NaiveDate) -> FinanceResult<BigDecimal> {
        self.fees.amount_due(slip, today).await
    }

    pub async fn prepare_payment(
        &self,
        slip_id: &str,
        today: NaiveDate,
    ) -> FinanceResult<PaymentForm> {
        let slip = self.get(slip_id).await?;
        self.payments.prepare(&slip, today).await
    }

    /// Settle a slip, defaulting the amount to what is due as of the payment date.
    ///
    /// The platform accrues overdue fees as of its own current date, so an
    /// overdue slip paid on any other day needs an explicit amount.
    pub async fn pay(
        &self,
        slip_id: &str,
        amount: Option<BigDecimal>,
        payment_date: Option<DateTime<Utc>>,
    ) -> FinanceResult<PaymentReceipt> {
        let slip = self.get(slip_id).await?;
        let amount = match amount {
            Some(amount) => amount,
            None => {
                let on = payment_date.unwrap_or_else(Utc::now).date_naive();
                if slip.status.is_payable() && on > slip.due_date && on != Utc::now().date_naive() {
                    return Err(FinanceError::InvalidField {
                        field: "amount".to_string(),
                        reason: format!(
                            "required for overdue slip {} paid on {}",
                            slip.id, on
                        ),
                    });
                }
                self.fees.amount_due(&slip, on).await?
            }
        };
        self.payments.settle(&slip, &amount, payment_date).await
    }
}
