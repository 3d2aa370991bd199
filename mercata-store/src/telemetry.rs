use mercata_shared::models::events::{
    OrderCancelledEvent, OrderPlacedEvent, OrderStatusChangedEvent,
};
use serde::Serialize;
use crate::events::EventProducer;

/// Telemetry sink for order lifecycle events. Publishes to kafka when a
/// broker is configured; otherwise the events only hit the log stream.
/// Telemetry must never fail a request, so publish errors are swallowed
/// after logging.
pub struct Telemetry {
    producer: Option<EventProducer>,
}

impl Telemetry {
    pub fn new(producer: Option<EventProducer>) -> Self {
        Self { producer }
    }

    pub fn disabled() -> Self {
        Self { producer: None }
    }

    async fn publish<T: Serialize>(&self, topic: &str, key: &str, event: &T) {
        let Some(producer) = &self.producer else {
            tracing::debug!("Telemetry disabled, dropping event for {}", topic);
            return;
        };

        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("Failed to serialize event for {}: {}", topic, e);
                return;
            }
        };

        if let Err(e) = producer.publish(topic, key, &payload).await {
            tracing::warn!("Failed to publish event to {}: {}", topic, e);
        }
    }

    pub async fn log_order_placed(&self, event: OrderPlacedEvent) {
        self.publish("orders.placed", &event.order_id.to_string(), &event)
            .await;
    }

    pub async fn log_status_changed(&self, event: OrderStatusChangedEvent) {
        self.publish("orders.status_changed", &event.order_id.to_string(), &event)
            .await;
    }

    pub async fn log_order_cancelled(&self, event: OrderCancelledEvent) {
        self.publish("orders.cancelled", &event.order_id.to_string(), &event)
            .await;
    }
}
