use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use mercata_order::models::{OrderStatus, PaymentStatus};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StripeWebhook {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub data: WebhookData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub object: WebhookObject,
}

#[derive(Debug, Deserialize)]
pub struct WebhookObject {
    pub id: String,
    /// Refund/charge objects reference the intent they belong to.
    pub payment_intent: Option<String>,
}

/// POST /v1/webhooks/payments/stripe
/// Reconciliation events from the processor. Authorization is synchronous
/// at order creation, so these only patch up payment state after the fact.
pub async fn handle_stripe_webhook(
    State(state): State<AppState>,
    Json(payload): Json<StripeWebhook>,
) -> Result<StatusCode, StatusCode> {
    tracing::info!("Received webhook: {} for object {}", payload.type_, payload.data.object.id);

    match payload.type_.as_str() {
        "payment_intent.payment_failed" => {
            let charge_id = &payload.data.object.id;
            if let Ok(Some(order)) = state.orders.find_by_charge_id(charge_id).await {
                state
                    .orders
                    .update_payment_status(order.id, PaymentStatus::Failed)
                    .await
                    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
                tracing::info!("Order {} payment marked FAILED via webhook", order.id);
            }
        }
        "charge.refunded" => {
            let charge_id = payload
                .data
                .object
                .payment_intent
                .as_deref()
                .unwrap_or(&payload.data.object.id);
            if let Ok(Some(order)) = state.orders.find_by_charge_id(charge_id).await {
                if order.order_status != OrderStatus::Cancelled {
                    tracing::warn!(
                        "Refund received for order {} which is {} rather than CANCELLED",
                        order.id,
                        order.order_status.as_str()
                    );
                }
            }
        }
        _ => {}
    }

    Ok(StatusCode::OK)
}
