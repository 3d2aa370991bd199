use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use mercata_shared::pii::Masked;

/// Masked card metadata returned by the processor alongside a charge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardSummary {
    pub brand: String,
    pub last4: Masked<String>,
}

/// The processor's record of a charge that was created and confirmed in one step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeRecord {
    pub id: String, // Provider's ID (e.g., pi_123)
    pub amount_cents: i32,
    pub currency: String,
    pub card: Option<CardSummary>,
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("No payment method provided")]
    MissingPaymentMethod,

    #[error("Payment declined [{code}]: {message}")]
    Declined {
        code: String,
        message: String,
        decline_reason: Option<String>,
    },

    #[error("Refund failed [{code}]: {message}")]
    RefundFailed { code: String, message: String },

    #[error("Payment provider error: {0}")]
    Provider(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create and confirm a charge in a single synchronous call.
    async fn create_and_confirm_charge(
        &self,
        amount_cents: i32,
        currency: &str,
        method_token: &str,
    ) -> Result<ChargeRecord, PaymentError>;

    /// Refund a previously confirmed charge in full.
    async fn refund(&self, charge_id: &str) -> Result<(), PaymentError>;
}
