use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use mercata_order::models::{OrderStatus, PaymentMethod, PaymentStatus, ShippingAddress};
use mercata_order::repository::AdminOrderFilter;
use mercata_order::service::{PlaceOrderItem, PlaceOrderRequest};
use mercata_shared::models::events::{
    OrderCancelledEvent, OrderPlacedEvent, OrderStatusChangedEvent,
};

use crate::error::ApiError;
use crate::middleware::auth::Claims;
use crate::state::AppState;

/// Uniform success envelope; errors use the mirror shape via `ApiError`.
pub(crate) fn success<T: Serialize>(data: T) -> Json<Value> {
    Json(json!({ "success": true, "data": data }))
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateOrderItemRequest {
    pub product_id: Uuid,
    /// Color id or display name.
    pub color: String,
    /// Size id or display name.
    pub size: String,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<CreateOrderItemRequest>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub payment_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
    pub tracking_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdminOrdersQuery {
    pub status: Option<String>,
    pub payment_method: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

// ============================================================================
// Customer Handlers
// ============================================================================

/// POST /v1/orders
/// Create an order: authorize payment (card), persist and reserve stock.
pub async fn create_order(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let payment_method = PaymentMethod::parse(&req.payment_method).ok_or_else(|| {
        ApiError::Validation(format!("Unknown payment method '{}'", req.payment_method))
    })?;

    let request = PlaceOrderRequest {
        items: req
            .items
            .into_iter()
            .map(|item| PlaceOrderItem {
                product_id: item.product_id,
                color: item.color,
                size: item.size,
                quantity: item.quantity,
            })
            .collect(),
        shipping_address: req.shipping_address,
        payment_method,
        payment_token: req.payment_token,
    };

    let order = state.service.place_order(&claims.identity(), request).await?;

    state
        .telemetry
        .log_order_placed(OrderPlacedEvent {
            order_id: order.id,
            customer_id: order.customer_id.clone(),
            total_cents: order.total_cents,
            payment_method: order.payment_method.as_str().to_string(),
            timestamp: Utc::now().timestamp(),
        })
        .await;

    Ok((StatusCode::CREATED, success(order)))
}

/// GET /v1/orders
/// List the authenticated customer's orders.
pub async fn list_orders(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Value>, ApiError> {
    let orders = state.service.list_orders(&claims.identity()).await?;
    Ok(success(orders))
}

/// GET /v1/orders/{id}
pub async fn get_order(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let order = state.service.get_order(&claims.identity(), order_id).await?;
    Ok(success(order))
}

/// POST /v1/orders/{id}/cancel
/// Customer cancellation; permitted only while the order is PENDING.
pub async fn cancel_order(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let order = state.service.cancel_order(&claims.identity(), order_id).await?;

    let refunded = order.payment_method == PaymentMethod::Card
        && order.payment_status == PaymentStatus::Completed;
    state
        .telemetry
        .log_order_cancelled(OrderCancelledEvent {
            order_id: order.id,
            customer_id: order.customer_id.clone(),
            refunded,
            timestamp: Utc::now().timestamp(),
        })
        .await;

    Ok(success(order))
}

// ============================================================================
// Admin Handlers
// ============================================================================

/// GET /v1/orders/admin/all
/// Paginated listing with status/payment-method/date/search filters.
pub async fn list_admin_orders(
    State(state): State<AppState>,
    Query(query): Query<AdminOrdersQuery>,
) -> Result<Json<Value>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(|s| {
            OrderStatus::parse(s)
                .ok_or_else(|| ApiError::Validation(format!("Unknown order status '{}'", s)))
        })
        .transpose()?;

    let payment_method = query
        .payment_method
        .as_deref()
        .map(|m| {
            PaymentMethod::parse(m)
                .ok_or_else(|| ApiError::Validation(format!("Unknown payment method '{}'", m)))
        })
        .transpose()?;

    let filter = AdminOrderFilter {
        status,
        payment_method,
        from: query.from,
        to: query.to,
        search: query.search,
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(20),
    };

    let page = state.service.list_admin(&filter).await?;
    Ok(success(page))
}

/// PUT /v1/orders/{id}/status
/// Admin status transition; ledger side effects follow the transition table.
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<UpdateOrderStatusRequest>,
) -> Result<Json<Value>, ApiError> {
    let new_status = OrderStatus::parse(&req.status)
        .ok_or_else(|| ApiError::Validation(format!("Unknown order status '{}'", req.status)))?;

    let change = state
        .service
        .update_status(order_id, new_status, req.tracking_number)
        .await?;

    state
        .telemetry
        .log_status_changed(OrderStatusChangedEvent {
            order_id: change.order.id,
            previous_status: change.previous.as_str().to_string(),
            new_status: change.order.order_status.as_str().to_string(),
            timestamp: Utc::now().timestamp(),
        })
        .await;

    Ok(success(change.order))
}
