use mercata_core::payment::{CardSummary, ChargeRecord, PaymentError, PaymentGateway};
use mercata_shared::pii::Masked;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Wraps the external processor. Authorization is synchronous
/// create-and-confirm on the critical path of order creation; nothing is
/// retried here and nothing is persisted here — the caller stores the
/// returned charge id on the order.
pub struct PaymentCoordinator {
    gateway: Arc<dyn PaymentGateway>,
}

impl PaymentCoordinator {
    pub fn new(gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { gateway }
    }

    pub async fn authorize(
        &self,
        amount_cents: i32,
        currency: &str,
        method_token: Option<&str>,
    ) -> Result<ChargeRecord, PaymentError> {
        let token = method_token
            .filter(|t| !t.is_empty())
            .ok_or(PaymentError::MissingPaymentMethod)?;

        self.gateway
            .create_and_confirm_charge(amount_cents, currency, token)
            .await
    }

    pub async fn refund(&self, charge_id: &str) -> Result<(), PaymentError> {
        self.gateway.refund(charge_id).await
    }
}

/// Development/test gateway. `tok_declined` simulates a processor decline
/// and `tok_norefund` produces a charge whose refund fails.
pub struct MockGateway;

#[async_trait::async_trait]
impl PaymentGateway for MockGateway {
    async fn create_and_confirm_charge(
        &self,
        amount_cents: i32,
        currency: &str,
        method_token: &str,
    ) -> Result<ChargeRecord, PaymentError> {
        if method_token == "tok_declined" {
            return Err(PaymentError::Declined {
                code: "card_declined".to_string(),
                message: "Your card was declined".to_string(),
                decline_reason: Some("generic_decline".to_string()),
            });
        }

        let id = if method_token == "tok_norefund" {
            format!("mock_ch_norefund_{}", Uuid::new_v4().simple())
        } else {
            format!("mock_ch_{}", Uuid::new_v4().simple())
        };

        Ok(ChargeRecord {
            id,
            amount_cents,
            currency: currency.to_string(),
            card: Some(CardSummary {
                brand: "visa".to_string(),
                last4: Masked("4242".to_string()),
            }),
        })
    }

    async fn refund(&self, charge_id: &str) -> Result<(), PaymentError> {
        if charge_id.contains("norefund") {
            return Err(PaymentError::RefundFailed {
                code: "charge_disputed".to_string(),
                message: "Charge cannot be refunded".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Stripe gateway
// ============================================================================

#[derive(Debug, Deserialize)]
struct PaymentIntentObject {
    id: String,
    status: String,
    latest_charge: Option<ChargeObject>,
}

#[derive(Debug, Deserialize)]
struct ChargeObject {
    payment_method_details: Option<PaymentMethodDetails>,
}

#[derive(Debug, Deserialize)]
struct PaymentMethodDetails {
    card: Option<CardDetails>,
}

#[derive(Debug, Deserialize)]
struct CardDetails {
    brand: String,
    last4: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeApiError,
}

#[derive(Debug, Deserialize)]
struct StripeApiError {
    code: Option<String>,
    message: Option<String>,
    decline_code: Option<String>,
}

pub struct StripeGateway {
    http: reqwest::Client,
    secret_key: String,
    base_url: String,
}

impl StripeGateway {
    pub fn new(secret_key: String) -> Self {
        Self::with_base_url(secret_key, "https://api.stripe.com".to_string())
    }

    /// Point the gateway at a different host (stripe-mock in tests).
    pub fn with_base_url(secret_key: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key,
            base_url,
        }
    }

    async fn decode_error(response: reqwest::Response) -> PaymentError {
        match response.json::<StripeErrorBody>().await {
            Ok(body) => PaymentError::Declined {
                code: body.error.code.unwrap_or_else(|| "api_error".to_string()),
                message: body
                    .error
                    .message
                    .unwrap_or_else(|| "Payment could not be processed".to_string()),
                decline_reason: body.error.decline_code,
            },
            Err(e) => PaymentError::Provider(format!("Unreadable processor error: {}", e)),
        }
    }
}

#[async_trait::async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_and_confirm_charge(
        &self,
        amount_cents: i32,
        currency: &str,
        method_token: &str,
    ) -> Result<ChargeRecord, PaymentError> {
        let params = [
            ("amount", amount_cents.to_string()),
            ("currency", currency.to_lowercase()),
            ("payment_method", method_token.to_string()),
            ("confirm", "true".to_string()),
            ("expand[]", "latest_charge".to_string()),
        ];

        let response = self
            .http
            .post(format!("{}/v1/payment_intents", self.base_url))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&params)
            .send()
            .await
            .map_err(|e| PaymentError::Provider(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::decode_error(response).await);
        }

        let intent: PaymentIntentObject = response
            .json()
            .await
            .map_err(|e| PaymentError::Provider(e.to_string()))?;

        if intent.status != "succeeded" {
            return Err(PaymentError::Declined {
                code: "authorization_incomplete".to_string(),
                message: format!("Payment intent {} is {}", intent.id, intent.status),
                decline_reason: None,
            });
        }

        let card = intent
            .latest_charge
            .and_then(|c| c.payment_method_details)
            .and_then(|d| d.card)
            .map(|c| CardSummary {
                brand: c.brand,
                last4: Masked(c.last4),
            });

        Ok(ChargeRecord {
            id: intent.id,
            amount_cents,
            currency: currency.to_string(),
            card,
        })
    }

    async fn refund(&self, charge_id: &str) -> Result<(), PaymentError> {
        let params = [("payment_intent", charge_id.to_string())];

        let response = self
            .http
            .post(format!("{}/v1/refunds", self.base_url))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&params)
            .send()
            .await
            .map_err(|e| PaymentError::Provider(e.to_string()))?;

        if !response.status().is_success() {
            return match Self::decode_error(response).await {
                PaymentError::Declined { code, message, .. } => {
                    Err(PaymentError::RefundFailed { code, message })
                }
                other => Err(other),
            };
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_authorize_requires_payment_method() {
        let coordinator = PaymentCoordinator::new(Arc::new(MockGateway));

        let err = coordinator.authorize(5000, "USD", None).await.unwrap_err();
        assert!(matches!(err, PaymentError::MissingPaymentMethod));

        let err = coordinator
            .authorize(5000, "USD", Some(""))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::MissingPaymentMethod));
    }

    #[tokio::test]
    async fn test_mock_gateway_declines_trigger_token() {
        let coordinator = PaymentCoordinator::new(Arc::new(MockGateway));

        let err = coordinator
            .authorize(5000, "USD", Some("tok_declined"))
            .await
            .unwrap_err();

        match err {
            PaymentError::Declined { code, decline_reason, .. } => {
                assert_eq!(code, "card_declined");
                assert_eq!(decline_reason.as_deref(), Some("generic_decline"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_mock_gateway_charges_carry_card_metadata() {
        let coordinator = PaymentCoordinator::new(Arc::new(MockGateway));

        let charge = coordinator
            .authorize(5000, "USD", Some("tok_visa"))
            .await
            .unwrap();

        assert!(charge.id.starts_with("mock_ch_"));
        assert_eq!(charge.amount_cents, 5000);
        assert_eq!(charge.card.unwrap().brand, "visa");
    }
}
