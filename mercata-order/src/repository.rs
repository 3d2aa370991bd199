use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use mercata_catalog::inventory::InventoryError;
use crate::models::{Order, OrderStatus, PaymentMethod, PaymentStatus};

#[derive(Debug, thiserror::Error)]
pub enum OrderRepoError {
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error("Order store error: {0}")]
    Backend(String),
}

/// Admin listing filters. All optional; `search` matches order id, customer
/// id, or tracking number.
#[derive(Debug, Clone)]
pub struct AdminOrderFilter {
    pub status: Option<OrderStatus>,
    pub payment_method: Option<PaymentMethod>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub search: Option<String>,
    pub page: i64,
    pub per_page: i64,
}

impl Default for AdminOrderFilter {
    fn default() -> Self {
        Self {
            status: None,
            payment_method: None,
            from: None,
            to: None,
            search: None,
            page: 1,
            per_page: 20,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

/// Repository trait for order data access.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persist the order and reserve its inventory as one atomic unit. On
    /// `InsufficientStock` nothing is persisted and no stock is held.
    async fn create_with_reservation(&self, order: &Order) -> Result<(), OrderRepoError>;

    async fn get(&self, id: Uuid) -> Result<Option<Order>, OrderRepoError>;

    async fn list_for_customer(&self, customer_id: &str) -> Result<Vec<Order>, OrderRepoError>;

    async fn list_admin(&self, filter: &AdminOrderFilter) -> Result<OrderPage, OrderRepoError>;

    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
        payment_status: Option<PaymentStatus>,
        tracking_number: Option<&str>,
    ) -> Result<(), OrderRepoError>;

    async fn update_payment_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
    ) -> Result<(), OrderRepoError>;

    async fn find_by_charge_id(&self, charge_id: &str) -> Result<Option<Order>, OrderRepoError>;
}
