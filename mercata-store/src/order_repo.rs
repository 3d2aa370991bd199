use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use mercata_order::models::{
    Order, OrderItem, OrderStatus, PaymentDetails, PaymentMethod, PaymentStatus, ShippingAddress,
};
use mercata_order::repository::{AdminOrderFilter, OrderPage, OrderRepoError, OrderRepository};

use crate::inventory_repo::{refresh_availability, reserve_line, touched_products};

pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn backend(e: sqlx::Error) -> OrderRepoError {
    OrderRepoError::Backend(e.to_string())
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    customer_id: String,
    order_status: String,
    payment_method: String,
    payment_status: String,
    payment_details: Option<serde_json::Value>,
    shipping_address: serde_json::Value,
    total_cents: i32,
    shipping_cents: i32,
    currency: String,
    tracking_number: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: Uuid,
    product_id: Uuid,
    product_name: String,
    color_id: Uuid,
    color_name: String,
    size_id: Uuid,
    size_name: String,
    quantity: i32,
    price_cents: i32,
}

const ORDER_COLUMNS: &str = "id, customer_id, order_status, payment_method, payment_status, \
     payment_details, shipping_address, total_cents, shipping_cents, currency, tracking_number, \
     created_at, updated_at";

fn hydrate(row: OrderRow, items: Vec<OrderItemRow>) -> Result<Order, OrderRepoError> {
    let order_status = OrderStatus::parse(&row.order_status)
        .ok_or_else(|| OrderRepoError::Backend(format!("Unknown order status {}", row.order_status)))?;
    let payment_method = PaymentMethod::parse(&row.payment_method).ok_or_else(|| {
        OrderRepoError::Backend(format!("Unknown payment method {}", row.payment_method))
    })?;
    let payment_status = PaymentStatus::parse(&row.payment_status).ok_or_else(|| {
        OrderRepoError::Backend(format!("Unknown payment status {}", row.payment_status))
    })?;

    let shipping_address: ShippingAddress = serde_json::from_value(row.shipping_address)
        .map_err(|e| OrderRepoError::Backend(format!("Bad shipping address: {}", e)))?;
    let payment_details: Option<PaymentDetails> = row
        .payment_details
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| OrderRepoError::Backend(format!("Bad payment details: {}", e)))?;

    Ok(Order {
        id: row.id,
        customer_id: row.customer_id,
        items: items
            .into_iter()
            .map(|item| OrderItem {
                id: item.id,
                product_id: item.product_id,
                product_name: item.product_name,
                color_id: item.color_id,
                color_name: item.color_name,
                size_id: item.size_id,
                size_name: item.size_name,
                quantity: item.quantity,
                price_cents: item.price_cents,
            })
            .collect(),
        shipping_address,
        payment_method,
        payment_status,
        payment_details,
        order_status,
        total_cents: row.total_cents,
        shipping_cents: row.shipping_cents,
        currency: row.currency,
        tracking_number: row.tracking_number,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

impl PgOrderRepository {
    async fn items_for(&self, order_id: Uuid) -> Result<Vec<OrderItemRow>, OrderRepoError> {
        sqlx::query_as::<_, OrderItemRow>(
            "SELECT id, product_id, product_name, color_id, color_name, size_id, size_name, \
             quantity, price_cents FROM order_items WHERE order_id = $1",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)
    }

    async fn hydrate_rows(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, OrderRepoError> {
        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let items = self.items_for(row.id).await?;
            orders.push(hydrate(row, items)?);
        }
        Ok(orders)
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &AdminOrderFilter) {
    if let Some(status) = filter.status {
        qb.push(" AND order_status = ").push_bind(status.as_str());
    }
    if let Some(method) = filter.payment_method {
        qb.push(" AND payment_method = ").push_bind(method.as_str());
    }
    if let Some(from) = filter.from {
        qb.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        qb.push(" AND created_at <= ").push_bind(to);
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", search);
        qb.push(" AND (id::text ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR customer_id ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR tracking_number ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn create_with_reservation(&self, order: &Order) -> Result<(), OrderRepoError> {
        let shipping_address = serde_json::to_value(&order.shipping_address)
            .map_err(|e| OrderRepoError::Backend(e.to_string()))?;
        let payment_details = order
            .payment_details
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| OrderRepoError::Backend(e.to_string()))?;

        let mut tx = self.pool.begin().await.map_err(backend)?;

        sqlx::query(
            "INSERT INTO orders (id, customer_id, order_status, payment_method, payment_status, \
             payment_details, shipping_address, total_cents, shipping_cents, currency, \
             tracking_number, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(order.id)
        .bind(&order.customer_id)
        .bind(order.order_status.as_str())
        .bind(order.payment_method.as_str())
        .bind(order.payment_status.as_str())
        .bind(payment_details)
        .bind(shipping_address)
        .bind(order.total_cents)
        .bind(order.shipping_cents)
        .bind(&order.currency)
        .bind(order.tracking_number.as_deref())
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        for item in &order.items {
            sqlx::query(
                "INSERT INTO order_items (id, order_id, product_id, product_name, color_id, \
                 color_name, size_id, size_name, quantity, price_cents) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            )
            .bind(item.id)
            .bind(order.id)
            .bind(item.product_id)
            .bind(&item.product_name)
            .bind(item.color_id)
            .bind(&item.color_name)
            .bind(item.size_id)
            .bind(&item.size_name)
            .bind(item.quantity)
            .bind(item.price_cents)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        }

        // Reserve inside the same transaction: a failed line rolls back the
        // order rows, so no order ever exists without its reservation.
        let lines = order.stock_lines();
        for line in &lines {
            reserve_line(&mut tx, line).await?;
        }
        for product_id in touched_products(&lines) {
            refresh_availability(&mut tx, product_id).await?;
        }

        tx.commit().await.map_err(backend)?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Order>, OrderRepoError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM orders WHERE id = $1",
            ORDER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        match row {
            Some(row) => {
                let items = self.items_for(row.id).await?;
                Ok(Some(hydrate(row, items)?))
            }
            None => Ok(None),
        }
    }

    async fn list_for_customer(&self, customer_id: &str) -> Result<Vec<Order>, OrderRepoError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM orders WHERE customer_id = $1 ORDER BY created_at DESC",
            ORDER_COLUMNS
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        self.hydrate_rows(rows).await
    }

    async fn list_admin(&self, filter: &AdminOrderFilter) -> Result<OrderPage, OrderRepoError> {
        let mut count_qb =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM orders WHERE 1 = 1");
        push_filters(&mut count_qb, filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;

        let page = filter.page.max(1);
        let per_page = filter.per_page.clamp(1, 100);

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM orders WHERE 1 = 1",
            ORDER_COLUMNS
        ));
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(per_page)
            .push(" OFFSET ")
            .push_bind((page - 1) * per_page);

        let rows: Vec<OrderRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

        Ok(OrderPage {
            orders: self.hydrate_rows(rows).await?,
            total,
            page,
            per_page,
        })
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
        payment_status: Option<PaymentStatus>,
        tracking_number: Option<&str>,
    ) -> Result<(), OrderRepoError> {
        let updated = sqlx::query(
            "UPDATE orders SET order_status = $1, \
             payment_status = COALESCE($2, payment_status), \
             tracking_number = COALESCE($3, tracking_number), \
             updated_at = NOW() WHERE id = $4",
        )
        .bind(status.as_str())
        .bind(payment_status.map(|p| p.as_str()))
        .bind(tracking_number)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(backend)?
        .rows_affected();

        if updated == 0 {
            return Err(OrderRepoError::Backend(format!("Order {} missing on update", id)));
        }
        Ok(())
    }

    async fn update_payment_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
    ) -> Result<(), OrderRepoError> {
        sqlx::query("UPDATE orders SET payment_status = $1, updated_at = NOW() WHERE id = $2")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn find_by_charge_id(&self, charge_id: &str) -> Result<Option<Order>, OrderRepoError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM orders WHERE payment_details->>'charge_id' = $1",
            ORDER_COLUMNS
        ))
        .bind(charge_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        match row {
            Some(row) => {
                let items = self.items_for(row.id).await?;
                Ok(Some(hydrate(row, items)?))
            }
            None => Ok(None),
        }
    }
}
