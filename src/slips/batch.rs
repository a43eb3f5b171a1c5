//! Bank slip batch generation and delivery

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::traits::*;
use crate::types::*;
use crate::utils::money::{parse_amount, round_currency};
use crate::utils::validation::{students_from_directory, validate_positive_amount};

/// Raw operator inputs of the generation form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchForm {
    pub selected_students: Vec<String>,
    pub amount: String,
    /// `YYYY-MM-DD`
    pub due_date: String,
    pub description: String,
}

impl BatchForm {
    /// Check required fields and parse the form into a typed request
    pub fn into_request(self) -> FinanceResult<BatchRequest> {
        if self.selected_students.is_empty() {
            return Err(FinanceError::MissingField("recipients".to_string()));
        }
        if self.amount.trim().is_empty() {
            return Err(FinanceError::MissingField("amount".to_string()));
        }
        if self.due_date.trim().is_empty() {
            return Err(FinanceError::MissingField("due_date".to_string()));
        }

        let amount = parse_amount(&self.amount)?;
        let due_date = NaiveDate::parse_from_str(self.due_date.trim(), "%Y-%m-%d").map_err(|e| {
            FinanceError::InvalidField {
                field: "due_date".to_string(),
                reason: e.to_string(),
            }
        })?;
        let description = self.description.trim();

        Ok(BatchRequest {
            recipient_ids: self.selected_students,
            amount,
            due_date,
            description: (!description.is_empty()).then(|| description.to_string()),
        })
    }
}

/// Typed generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub recipient_ids: Vec<String>,
    pub amount: BigDecimal,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub description: Option<String>,
}

/// Issues slips for a set of students in one platform call
pub struct BatchGenerator<P: FinancialPlatform> {
    platform: P,
    validator: Box<dyn RecipientValidator>,
}

impl<P: FinancialPlatform> BatchGenerator<P> {
    /// Create a generator using the UUID recipient gate
    pub fn new(platform: P) -> Self {
        Self::with_validator(platform, Box::new(DefaultRecipientValidator))
    }

    pub fn with_validator(platform: P, validator: Box<dyn RecipientValidator>) -> Self {
        Self {
            platform,
            validator,
        }
    }

    /// Directory entries that may be selected as recipients
    pub async fn eligible_recipients(&self) -> FinanceResult<Vec<DirectoryUser>> {
        let users = self.platform.list_users().await?;
        Ok(students_from_directory(users))
    }

    /// Generate one slip per recipient. Nothing is sent to the platform
    /// unless every recipient identifier passes validation.
    pub async fn generate(&self, request: &BatchRequest) -> FinanceResult<BatchId> {
        if let Err(e) = self.validator.validate_selection(&request.recipient_ids) {
            warn!(
                recipients = request.recipient_ids.len(),
                error = %e,
                "recipient selection rejected"
            );
            return Err(e);
        }
        validate_positive_amount("amount", &request.amount)?;

        let amount = round_currency(&request.amount);
        info!(
            recipients = request.recipient_ids.len(),
            %amount,
            due_date = %request.due_date,
            "generating bank slips"
        );

        let batch_id = self
            .platform
            .generate_bank_slips_batch(
                &request.recipient_ids,
                &amount,
                request.due_date,
                request.description.as_deref().unwrap_or(""),
            )
            .await
            .map_err(|e| {
                error!(recipients = request.recipient_ids.len(), error = %e, "bank slip generation failed");
                e
            })?;

        info!(batch_id = %batch_id, "bank slips generated");
        Ok(batch_id)
    }

    /// Email every slip of a generated batch
    pub async fn send_batch(&self, batch_id: &BatchId, email_template: &str) -> FinanceResult<()> {
        if batch_id.as_str().trim().is_empty() {
            return Err(FinanceError::MissingField("batch_id".to_string()));
        }
        if email_template.trim().is_empty() {
            return Err(FinanceError::Validation(
                "email template cannot be empty".to_string(),
            ));
        }

        self.platform
            .send_bank_slips_batch(batch_id, email_template)
            .await
            .map_err(|e| {
                error!(batch_id = %batch_id, error = %e, "sending bank slips failed");
                e
            })?;
        info!(batch_id = %batch_id, "bank slips sent");
        Ok(())
    }
}
