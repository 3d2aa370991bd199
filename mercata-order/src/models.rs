use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use mercata_catalog::inventory::StockLine;
use mercata_core::payment::ChargeRecord;
use mercata_shared::pii::Masked;

/// Order status in the lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(OrderStatus::Pending),
            "PROCESSING" => Some(OrderStatus::Processing),
            "SHIPPED" => Some(OrderStatus::Shipped),
            "DELIVERED" => Some(OrderStatus::Delivered),
            "CANCELLED" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Card,
    Cod,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "CARD",
            PaymentMethod::Cod => "COD",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CARD" => Some(PaymentMethod::Card),
            "COD" => Some(PaymentMethod::Cod),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(PaymentStatus::Pending),
            "COMPLETED" => Some(PaymentStatus::Completed),
            "FAILED" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }
}

/// Denormalized address snapshot taken at order creation. Not a live reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShippingAddress {
    pub full_name: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub region: String,
    pub postal_code: String,
    pub country: String,
    pub phone: Option<String>,
}

/// Processor charge reference plus masked card metadata. Present only for card payments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub charge_id: String,
    pub card_brand: Option<String>,
    pub card_last4: Option<Masked<String>>,
}

impl PaymentDetails {
    pub fn from_charge(charge: &ChargeRecord) -> Self {
        Self {
            charge_id: charge.id.clone(),
            card_brand: charge.card.as_ref().map(|c| c.brand.clone()),
            card_last4: charge.card.as_ref().map(|c| c.last4.clone()),
        }
    }
}

/// An individual line within an order. Name and price are snapshots taken
/// at order creation, not live references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub color_id: Uuid,
    pub color_name: String,
    pub size_id: Uuid,
    pub size_name: String,
    pub quantity: i32,
    pub price_cents: i32,
}

impl OrderItem {
    pub fn line_total_cents(&self) -> i32 {
        self.price_cents * self.quantity
    }
}

/// The single source of truth for a customer's purchase. Never physically
/// deleted; cancellation is a soft terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: String,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub payment_details: Option<PaymentDetails>,
    pub order_status: OrderStatus,
    pub total_cents: i32,
    pub shipping_cents: i32,
    pub currency: String,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(
        customer_id: String,
        items: Vec<OrderItem>,
        shipping_address: ShippingAddress,
        payment_method: PaymentMethod,
        shipping_cents: i32,
        currency: String,
    ) -> Self {
        let now = Utc::now();
        let subtotal: i32 = items.iter().map(|i| i.line_total_cents()).sum();
        Self {
            id: Uuid::new_v4(),
            customer_id,
            items,
            shipping_address,
            payment_method,
            payment_status: PaymentStatus::Pending,
            payment_details: None,
            order_status: OrderStatus::Pending,
            total_cents: subtotal + shipping_cents,
            shipping_cents,
            currency,
            tracking_number: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn subtotal_cents(&self) -> i32 {
        self.items.iter().map(|i| i.line_total_cents()).sum()
    }

    /// The ledger lines this order binds, one per line item.
    pub fn stock_lines(&self) -> Vec<StockLine> {
        self.items
            .iter()
            .map(|item| StockLine {
                product_id: item.product_id,
                color_id: item.color_id,
                size_id: item.size_id,
                quantity: item.quantity,
            })
            .collect()
    }

    pub fn update_status(&mut self, new_status: OrderStatus) {
        self.order_status = new_status;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Ada Lovelace".to_string(),
            line1: "12 Analytical Row".to_string(),
            line2: None,
            city: "London".to_string(),
            region: "LDN".to_string(),
            postal_code: "EC1A".to_string(),
            country: "GB".to_string(),
            phone: None,
        }
    }

    fn item(quantity: i32, price_cents: i32) -> OrderItem {
        OrderItem {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            product_name: "Crew Tee".to_string(),
            color_id: Uuid::new_v4(),
            color_name: "Black".to_string(),
            size_id: Uuid::new_v4(),
            size_name: "M".to_string(),
            quantity,
            price_cents,
        }
    }

    #[test]
    fn test_total_includes_shipping() {
        let order = Order::new(
            "cust-1".to_string(),
            vec![item(2, 2500), item(1, 1000)],
            address(),
            PaymentMethod::Cod,
            500,
            "USD".to_string(),
        );

        assert_eq!(order.subtotal_cents(), 6000);
        assert_eq!(order.total_cents, 6500);
        assert_eq!(order.order_status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
    }

    #[test]
    fn test_stock_lines_mirror_items() {
        let line_item = item(3, 2500);
        let order = Order::new(
            "cust-1".to_string(),
            vec![line_item.clone()],
            address(),
            PaymentMethod::Card,
            0,
            "USD".to_string(),
        );

        let lines = order.stock_lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].product_id, line_item.product_id);
        assert_eq!(lines[0].quantity, 3);
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("REFUNDED"), None);
    }
}
