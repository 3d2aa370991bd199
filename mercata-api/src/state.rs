use std::sync::Arc;
use std::time::Duration;

use mercata_catalog::repository::CatalogRepository;
use mercata_order::repository::OrderRepository;
use mercata_order::service::OrderService;
use mercata_store::{RedisClient, Telemetry};

use crate::middleware::resiliency::CircuitBreaker;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

pub struct Resiliency {
    pub payment_cb: CircuitBreaker,
}

impl Resiliency {
    pub fn new() -> Self {
        Self {
            payment_cb: CircuitBreaker::new("payment", 5, Duration::from_secs(30)),
        }
    }
}

impl Default for Resiliency {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<OrderService>,
    pub orders: Arc<dyn OrderRepository>,
    pub catalog: Arc<dyn CatalogRepository>,
    pub telemetry: Arc<Telemetry>,
    pub redis: Option<Arc<RedisClient>>,
    pub auth: AuthConfig,
    pub resiliency: Arc<Resiliency>,
    pub rate_limit_per_minute: i64,
}
