use std::sync::Arc;
use uuid::Uuid;

use mercata_catalog::inventory::{InventoryError, InventoryLedger};
use mercata_catalog::repository::CatalogRepository;
use mercata_core::identity::Identity;
use mercata_core::payment::PaymentError;

use crate::coordinator::PaymentCoordinator;
use crate::lifecycle::{self, InventoryAction};
use crate::models::{
    Order, OrderItem, OrderStatus, PaymentDetails, PaymentMethod, PaymentStatus, ShippingAddress,
};
use crate::repository::{AdminOrderFilter, OrderPage, OrderRepoError, OrderRepository};

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error("Invalid state transition from {from} to {to}")]
    Transition { from: String, to: String },

    #[error("Order store error: {0}")]
    Repo(String),
}

impl From<OrderRepoError> for OrderError {
    fn from(e: OrderRepoError) -> Self {
        match e {
            OrderRepoError::Inventory(inner) => OrderError::Inventory(inner),
            OrderRepoError::Backend(msg) => OrderError::Repo(msg),
        }
    }
}

fn backend(e: Box<dyn std::error::Error + Send + Sync>) -> OrderError {
    OrderError::Repo(e.to_string())
}

#[derive(Debug, Clone)]
pub struct PlaceOrderItem {
    pub product_id: Uuid,
    /// Color id or display name; resolved against the catalog.
    pub color: String,
    /// Size id or display name; resolved against the catalog.
    pub size: String,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct PlaceOrderRequest {
    pub items: Vec<PlaceOrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub payment_token: Option<String>,
}

/// Flat shipping fee with an optional free-shipping threshold.
#[derive(Debug, Clone)]
pub struct ShippingPolicy {
    pub fee_cents: i32,
    pub free_threshold_cents: Option<i32>,
}

impl ShippingPolicy {
    pub fn quote(&self, subtotal_cents: i32) -> i32 {
        match self.free_threshold_cents {
            Some(threshold) if subtotal_cents >= threshold => 0,
            _ => self.fee_cents,
        }
    }
}

/// The outcome of a status transition, carrying the prior status for
/// auditing and telemetry.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub previous: OrderStatus,
    pub order: Order,
}

/// Drives the order lifecycle: creation with payment authorization and
/// inventory reservation, admin status transitions with their ledger side
/// effects, and customer cancellation.
pub struct OrderService {
    catalog: Arc<dyn CatalogRepository>,
    orders: Arc<dyn OrderRepository>,
    ledger: Arc<dyn InventoryLedger>,
    payments: PaymentCoordinator,
    shipping: ShippingPolicy,
    currency: String,
}

impl OrderService {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        orders: Arc<dyn OrderRepository>,
        ledger: Arc<dyn InventoryLedger>,
        payments: PaymentCoordinator,
        shipping: ShippingPolicy,
        currency: String,
    ) -> Self {
        Self {
            catalog,
            orders,
            ledger,
            payments,
            shipping,
            currency,
        }
    }

    /// Creation protocol: resolve variants, authorize card payment, then
    /// persist the order and reserve stock in one atomic store operation.
    /// A failed authorization aborts before anything is persisted; a failed
    /// reservation after a successful charge triggers a compensating refund.
    pub async fn place_order(
        &self,
        identity: &Identity,
        req: PlaceOrderRequest,
    ) -> Result<Order, OrderError> {
        if req.items.is_empty() {
            return Err(OrderError::Validation("Order has no items".to_string()));
        }

        let mut items = Vec::with_capacity(req.items.len());
        for line in &req.items {
            if line.quantity < 1 {
                return Err(OrderError::Validation(format!(
                    "Quantity must be at least 1 for product {}",
                    line.product_id
                )));
            }

            let product = self
                .catalog
                .get_product(line.product_id)
                .await
                .map_err(backend)?
                .ok_or_else(|| {
                    OrderError::NotFound(format!("Product {} not found", line.product_id))
                })?;

            let color = self
                .catalog
                .resolve_color(&line.color)
                .await
                .map_err(backend)?
                .ok_or_else(|| OrderError::Validation(format!("Unknown color '{}'", line.color)))?;

            let size = self
                .catalog
                .resolve_size(&line.size)
                .await
                .map_err(backend)?
                .ok_or_else(|| OrderError::Validation(format!("Unknown size '{}'", line.size)))?;

            if product.variant(color.id, size.id).is_none() {
                return Err(OrderError::NotFound(format!(
                    "Product {} has no {} / {} variant",
                    product.name, color.name, size.name
                )));
            }

            items.push(OrderItem {
                id: Uuid::new_v4(),
                product_id: product.id,
                product_name: product.name.clone(),
                color_id: color.id,
                color_name: color.name,
                size_id: size.id,
                size_name: size.name,
                quantity: line.quantity,
                price_cents: product.price_cents,
            });
        }

        let subtotal: i32 = items.iter().map(|i| i.line_total_cents()).sum();
        let mut order = Order::new(
            identity.customer_id.clone(),
            items,
            req.shipping_address,
            req.payment_method,
            self.shipping.quote(subtotal),
            self.currency.clone(),
        );

        let charge = match req.payment_method {
            PaymentMethod::Card => Some(
                self.payments
                    .authorize(order.total_cents, &self.currency, req.payment_token.as_deref())
                    .await?,
            ),
            PaymentMethod::Cod => None,
        };

        if let Some(record) = &charge {
            order.payment_status = PaymentStatus::Completed;
            order.payment_details = Some(PaymentDetails::from_charge(record));
        }

        if let Err(e) = self.orders.create_with_reservation(&order).await {
            if let Some(record) = &charge {
                if let Err(refund_err) = self.payments.refund(&record.id).await {
                    tracing::error!(
                        order_id = %order.id,
                        charge_id = %record.id,
                        "Compensating refund failed after reservation failure: {}",
                        refund_err
                    );
                }
            }
            return Err(e.into());
        }

        tracing::info!(order_id = %order.id, customer_id = %order.customer_id, "Order placed");
        Ok(order)
    }

    /// Status-transition protocol (admin). Refunds card charges when the
    /// target is CANCELLED, applies the transition's ledger action, and
    /// auto-completes COD payment on delivery.
    pub async fn update_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
        tracking_number: Option<String>,
    ) -> Result<StatusChange, OrderError> {
        let mut order = self
            .orders
            .get(order_id)
            .await?
            .ok_or_else(|| OrderError::NotFound(format!("Order {} not found", order_id)))?;

        let prev = order.order_status;
        if !lifecycle::transition_permitted(prev, new_status) {
            return Err(OrderError::Transition {
                from: prev.as_str().to_string(),
                to: new_status.as_str().to_string(),
            });
        }

        // Refund before touching anything so a processor failure leaves the
        // order exactly as it was.
        if new_status == OrderStatus::Cancelled {
            self.refund_if_charged(&order).await?;
        }

        self.apply_inventory_action(lifecycle::next_inventory_action(prev, new_status), &order)
            .await?;

        let payment_update = if order.payment_method == PaymentMethod::Cod
            && new_status == OrderStatus::Delivered
            && order.payment_status != PaymentStatus::Completed
        {
            Some(PaymentStatus::Completed)
        } else {
            None
        };

        self.orders
            .update_status(order_id, new_status, payment_update, tracking_number.as_deref())
            .await?;

        order.update_status(new_status);
        if let Some(ps) = payment_update {
            order.payment_status = ps;
        }
        if let Some(tracking) = tracking_number {
            order.tracking_number = Some(tracking);
        }

        tracing::info!(
            order_id = %order_id,
            from = prev.as_str(),
            to = new_status.as_str(),
            "Order status updated"
        );
        Ok(StatusChange {
            previous: prev,
            order,
        })
    }

    /// Cancellation protocol (customer): permitted only while PENDING and
    /// only for the owning customer. Card charges are refunded first; the
    /// initial reservation is released.
    pub async fn cancel_order(
        &self,
        identity: &Identity,
        order_id: Uuid,
    ) -> Result<Order, OrderError> {
        let mut order = self.get_order(identity, order_id).await?;

        if order.order_status != OrderStatus::Pending {
            return Err(OrderError::Validation(
                "Only pending orders can be cancelled".to_string(),
            ));
        }

        self.refund_if_charged(&order).await?;

        self.apply_inventory_action(
            lifecycle::next_inventory_action(order.order_status, OrderStatus::Cancelled),
            &order,
        )
        .await?;

        self.orders
            .update_status(order_id, OrderStatus::Cancelled, None, None)
            .await?;

        order.update_status(OrderStatus::Cancelled);
        tracing::info!(order_id = %order_id, "Order cancelled by customer");
        Ok(order)
    }

    /// Fetch one order. A foreign order reads as not-found for non-admins.
    pub async fn get_order(&self, identity: &Identity, order_id: Uuid) -> Result<Order, OrderError> {
        let order = self
            .orders
            .get(order_id)
            .await?
            .ok_or_else(|| OrderError::NotFound(format!("Order {} not found", order_id)))?;

        if !identity.is_admin() && order.customer_id != identity.customer_id {
            return Err(OrderError::NotFound(format!("Order {} not found", order_id)));
        }

        Ok(order)
    }

    pub async fn list_orders(&self, identity: &Identity) -> Result<Vec<Order>, OrderError> {
        Ok(self.orders.list_for_customer(&identity.customer_id).await?)
    }

    pub async fn list_admin(&self, filter: &AdminOrderFilter) -> Result<OrderPage, OrderError> {
        Ok(self.orders.list_admin(filter).await?)
    }

    async fn refund_if_charged(&self, order: &Order) -> Result<(), OrderError> {
        if order.payment_method != PaymentMethod::Card
            || order.payment_status != PaymentStatus::Completed
        {
            return Ok(());
        }

        let details = order.payment_details.as_ref().ok_or_else(|| {
            OrderError::Repo(format!("Order {} has no charge to refund", order.id))
        })?;

        self.payments.refund(&details.charge_id).await?;
        tracing::info!(order_id = %order.id, charge_id = %details.charge_id, "Charge refunded");
        Ok(())
    }

    async fn apply_inventory_action(
        &self,
        action: InventoryAction,
        order: &Order,
    ) -> Result<(), OrderError> {
        let lines = order.stock_lines();
        match action {
            InventoryAction::Reduce => self.ledger.reduce_on_fulfillment(&lines).await?,
            InventoryAction::Restore => self.ledger.restore(&lines).await?,
            InventoryAction::None => {}
        }
        Ok(())
    }
}
