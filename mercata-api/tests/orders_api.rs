use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tower::ServiceExt;
use uuid::Uuid;

use mercata_api::middleware::auth::Claims;
use mercata_api::state::{AppState, AuthConfig, Resiliency};
use mercata_api::app;
use mercata_catalog::inventory::MemoryLedger;
use mercata_catalog::product::{Color, Product, Size, Variant};
use mercata_catalog::repository::CatalogRepository;
use mercata_order::coordinator::{MockGateway, PaymentCoordinator};
use mercata_order::models::{Order, OrderStatus, PaymentStatus};
use mercata_order::repository::{AdminOrderFilter, OrderPage, OrderRepoError, OrderRepository};
use mercata_order::service::{OrderService, ShippingPolicy};
use mercata_store::Telemetry;

const SECRET: &str = "test-secret";

// ============================================================================
// In-memory fakes
// ============================================================================

struct MemoryOrderRepo {
    orders: Mutex<HashMap<Uuid, Order>>,
    ledger: Arc<MemoryLedger>,
}

#[async_trait]
impl OrderRepository for MemoryOrderRepo {
    async fn create_with_reservation(&self, order: &Order) -> Result<(), OrderRepoError> {
        self.ledger.reserve(&order.stock_lines()).await?;
        self.orders.lock().await.insert(order.id, order.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Order>, OrderRepoError> {
        Ok(self.orders.lock().await.get(&id).cloned())
    }

    async fn list_for_customer(&self, customer_id: &str) -> Result<Vec<Order>, OrderRepoError> {
        Ok(self
            .orders
            .lock()
            .await
            .values()
            .filter(|o| o.customer_id == customer_id)
            .cloned()
            .collect())
    }

    async fn list_admin(&self, filter: &AdminOrderFilter) -> Result<OrderPage, OrderRepoError> {
        let orders: Vec<Order> = self
            .orders
            .lock()
            .await
            .values()
            .filter(|o| filter.status.map_or(true, |s| o.order_status == s))
            .filter(|o| filter.payment_method.map_or(true, |m| o.payment_method == m))
            .cloned()
            .collect();
        let total = orders.len() as i64;
        Ok(OrderPage {
            orders,
            total,
            page: filter.page,
            per_page: filter.per_page,
        })
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
        payment_status: Option<PaymentStatus>,
        tracking_number: Option<&str>,
    ) -> Result<(), OrderRepoError> {
        let mut orders = self.orders.lock().await;
        let order = orders
            .get_mut(&id)
            .ok_or_else(|| OrderRepoError::Backend("missing order".to_string()))?;
        order.update_status(status);
        if let Some(ps) = payment_status {
            order.payment_status = ps;
        }
        if let Some(t) = tracking_number {
            order.tracking_number = Some(t.to_string());
        }
        Ok(())
    }

    async fn update_payment_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
    ) -> Result<(), OrderRepoError> {
        let mut orders = self.orders.lock().await;
        let order = orders
            .get_mut(&id)
            .ok_or_else(|| OrderRepoError::Backend("missing order".to_string()))?;
        order.payment_status = status;
        Ok(())
    }

    async fn find_by_charge_id(&self, charge_id: &str) -> Result<Option<Order>, OrderRepoError> {
        Ok(self
            .orders
            .lock()
            .await
            .values()
            .find(|o| {
                o.payment_details
                    .as_ref()
                    .map_or(false, |d| d.charge_id == charge_id)
            })
            .cloned())
    }
}

struct MemoryCatalog {
    products: Mutex<Vec<Product>>,
    colors: Vec<Color>,
    sizes: Vec<Size>,
}

#[async_trait]
impl CatalogRepository for MemoryCatalog {
    async fn get_product(
        &self,
        id: Uuid,
    ) -> Result<Option<Product>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.products.lock().await.iter().find(|p| p.id == id).cloned())
    }

    async fn resolve_color(
        &self,
        token: &str,
    ) -> Result<Option<Color>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self
            .colors
            .iter()
            .find(|c| c.id.to_string() == token || c.name.eq_ignore_ascii_case(token))
            .cloned())
    }

    async fn resolve_size(
        &self,
        token: &str,
    ) -> Result<Option<Size>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self
            .sizes
            .iter()
            .find(|s| s.id.to_string() == token || s.name.eq_ignore_ascii_case(token))
            .cloned())
    }

    async fn set_variant_stock(
        &self,
        product_id: Uuid,
        color_id: Uuid,
        size_id: Uuid,
        stock: i32,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let mut products = self.products.lock().await;
        let Some(product) = products.iter_mut().find(|p| p.id == product_id) else {
            return Ok(false);
        };
        let Some(variant) = product
            .variants
            .iter_mut()
            .find(|v| v.color_id == color_id && v.size_id == size_id)
        else {
            return Ok(false);
        };
        variant.stock = stock;
        product.available_for_sale = product.variants.iter().any(|v| v.stock > 0);
        Ok(true)
    }
}

// ============================================================================
// Harness
// ============================================================================

struct TestApp {
    app: Router,
    ledger: Arc<MemoryLedger>,
    product_id: Uuid,
    color_id: Uuid,
    size_id: Uuid,
}

async fn setup(stock: i32) -> TestApp {
    let product_id = Uuid::new_v4();
    let color = Color {
        id: Uuid::new_v4(),
        name: "Black".to_string(),
    };
    let size = Size {
        id: Uuid::new_v4(),
        name: "M".to_string(),
    };
    let now = Utc::now();
    let product = Product {
        id: product_id,
        name: "Crew Tee".to_string(),
        description: None,
        price_cents: 2500,
        available_for_sale: stock > 0,
        variants: vec![Variant {
            product_id,
            color_id: color.id,
            size_id: size.id,
            stock,
        }],
        created_at: now,
        updated_at: now,
    };

    let ledger = Arc::new(MemoryLedger::new());
    ledger.set_stock(product_id, color.id, size.id, stock).await;

    let orders = Arc::new(MemoryOrderRepo {
        orders: Mutex::new(HashMap::new()),
        ledger: ledger.clone(),
    });
    let catalog = Arc::new(MemoryCatalog {
        products: Mutex::new(vec![product]),
        colors: vec![color.clone()],
        sizes: vec![size.clone()],
    });

    let service = Arc::new(OrderService::new(
        catalog.clone(),
        orders.clone(),
        ledger.clone(),
        PaymentCoordinator::new(Arc::new(MockGateway)),
        ShippingPolicy {
            fee_cents: 500,
            free_threshold_cents: None,
        },
        "USD".to_string(),
    ));

    let state = AppState {
        service,
        orders,
        catalog,
        telemetry: Arc::new(Telemetry::disabled()),
        redis: None,
        auth: AuthConfig {
            secret: SECRET.to_string(),
            expiration: 3600,
        },
        resiliency: Arc::new(Resiliency::new()),
        rate_limit_per_minute: 100,
    };

    TestApp {
        app: app(state),
        ledger,
        product_id,
        color_id: color.id,
        size_id: size.id,
    }
}

fn token(sub: &str, role: &str) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        email: None,
        role: role.to_string(),
        exp: (Utc::now().timestamp() + 3600) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

fn order_payload(product_id: Uuid, quantity: i32, payment_method: &str) -> Value {
    json!({
        "items": [{
            "product_id": product_id,
            "color": "Black",
            "size": "M",
            "quantity": quantity,
        }],
        "shipping_address": {
            "full_name": "Ada Lovelace",
            "line1": "12 Analytical Row",
            "line2": null,
            "city": "London",
            "region": "LDN",
            "postal_code": "EC1A",
            "country": "GB",
            "phone": null,
        },
        "payment_method": payment_method,
        "payment_token": if payment_method == "CARD" { json!("tok_visa") } else { Value::Null },
    })
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, bearer: Option<&str>, payload: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(payload.to_string())).unwrap()
}

fn put_json(uri: &str, bearer: &str, payload: &Value) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", bearer))
        .body(Body::from(payload.to_string()))
        .unwrap()
}

fn get_req(uri: &str, bearer: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", bearer))
        .body(Body::empty())
        .unwrap()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_create_order_returns_envelope_and_reserves_stock() {
    let t = setup(5).await;
    let customer = token("cust-1", "CUSTOMER");

    let (status, body) = send(
        &t.app,
        post_json("/v1/orders", Some(&customer), &order_payload(t.product_id, 3, "COD")),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["order_status"], json!("PENDING"));
    assert_eq!(body["data"]["total_cents"], json!(3 * 2500 + 500));

    let stock = t
        .ledger
        .stock(t.product_id, t.color_id, t.size_id)
        .await
        .unwrap();
    assert_eq!(stock, 2);
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let t = setup(5).await;

    let (status, body) = send(
        &t.app,
        post_json("/v1/orders", None, &order_payload(t.product_id, 1, "COD")),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn test_insufficient_stock_reports_counts() {
    let t = setup(5).await;
    let customer = token("cust-1", "CUSTOMER");

    let (status, _) = send(
        &t.app,
        post_json("/v1/orders", Some(&customer), &order_payload(t.product_id, 3, "COD")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &t.app,
        post_json("/v1/orders", Some(&customer), &order_payload(t.product_id, 3, "COD")),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("requested 3"), "got: {message}");
    assert!(message.contains("available 2"), "got: {message}");
}

#[tokio::test]
async fn test_customer_cannot_use_admin_routes() {
    let t = setup(5).await;
    let customer = token("cust-1", "CUSTOMER");

    let (status, _) = send(&t.app, get_req("/v1/orders/admin/all", &customer)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_status_flow() {
    let t = setup(10).await;
    let customer = token("cust-1", "CUSTOMER");
    let admin = token("admin-1", "ADMIN");

    let (_, body) = send(
        &t.app,
        post_json("/v1/orders", Some(&customer), &order_payload(t.product_id, 2, "CARD")),
    )
    .await;
    let order_id = body["data"]["id"].as_str().unwrap().to_string();

    // Unknown status values are rejected outright.
    let (status, _) = send(
        &t.app,
        put_json(
            &format!("/v1/orders/{}/status", order_id),
            &admin,
            &json!({"status": "TELEPORTED"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &t.app,
        put_json(
            &format!("/v1/orders/{}/status", order_id),
            &admin,
            &json!({"status": "PROCESSING"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["order_status"], json!("PROCESSING"));

    let (status, _) = send(
        &t.app,
        put_json(
            &format!("/v1/orders/{}/status", order_id),
            &admin,
            &json!({"status": "DELIVERED", "tracking_number": "TRK-42"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // DELIVERED is terminal.
    let (status, body) = send(
        &t.app,
        put_json(
            &format!("/v1/orders/{}/status", order_id),
            &admin,
            &json!({"status": "PROCESSING"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn test_admin_list_filters_by_status() {
    let t = setup(10).await;
    let customer = token("cust-1", "CUSTOMER");
    let admin = token("admin-1", "ADMIN");

    send(
        &t.app,
        post_json("/v1/orders", Some(&customer), &order_payload(t.product_id, 1, "COD")),
    )
    .await;

    let (status, body) = send(&t.app, get_req("/v1/orders/admin/all?status=PENDING", &admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], json!(1));

    let (_, body) = send(&t.app, get_req("/v1/orders/admin/all?status=SHIPPED", &admin)).await;
    assert_eq!(body["data"]["total"], json!(0));

    let (status, _) = send(&t.app, get_req("/v1/orders/admin/all?status=BOGUS", &admin)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cancel_restores_stock() {
    let t = setup(5).await;
    let customer = token("cust-1", "CUSTOMER");

    let (_, body) = send(
        &t.app,
        post_json("/v1/orders", Some(&customer), &order_payload(t.product_id, 2, "COD")),
    )
    .await;
    let order_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(
        t.ledger.stock(t.product_id, t.color_id, t.size_id).await,
        Some(3)
    );

    let (status, body) = send(
        &t.app,
        post_json(
            &format!("/v1/orders/{}/cancel", order_id),
            Some(&customer),
            &Value::Null,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["order_status"], json!("CANCELLED"));
    assert_eq!(
        t.ledger.stock(t.product_id, t.color_id, t.size_id).await,
        Some(5)
    );
}

#[tokio::test]
async fn test_foreign_order_reads_as_not_found() {
    let t = setup(5).await;
    let customer = token("cust-1", "CUSTOMER");
    let other = token("cust-2", "CUSTOMER");

    let (_, body) = send(
        &t.app,
        post_json("/v1/orders", Some(&customer), &order_payload(t.product_id, 1, "COD")),
    )
    .await;
    let order_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(&t.app, get_req(&format!("/v1/orders/{}", order_id), &other)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_stock_edit_roundtrip() {
    let t = setup(5).await;
    let admin = token("admin-1", "ADMIN");

    let (status, body) = send(
        &t.app,
        put_json(
            &format!("/v1/admin/products/{}/stock", t.product_id),
            &admin,
            &json!({"color": "Black", "size": "M", "stock": 7}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["stock"], json!(7));

    let (status, body) = send(
        &t.app,
        get_req(&format!("/v1/admin/products/{}/inventory", t.product_id), &admin),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["inventory"], json!(7));
    assert_eq!(body["data"]["available_for_sale"], json!(true));
}
