use std::net::SocketAddr;
use std::sync::Arc;

use mercata_api::{app, state::{AppState, AuthConfig, Resiliency}};
use mercata_core::payment::PaymentGateway;
use mercata_order::coordinator::{MockGateway, PaymentCoordinator, StripeGateway};
use mercata_order::service::{OrderService, ShippingPolicy};
use mercata_store::{
    DbClient, EventProducer, PgCatalogRepository, PgInventoryLedger, PgOrderRepository,
    RedisClient, Telemetry,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mercata_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = mercata_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Mercata API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    // Redis is only used for rate limiting; run without it if unreachable.
    let redis = match RedisClient::new(&config.redis.url).await {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            tracing::warn!("Redis unavailable, rate limiting disabled: {}", e);
            None
        }
    };

    let telemetry = match &config.kafka.brokers {
        Some(brokers) => match EventProducer::new(brokers) {
            Ok(producer) => Telemetry::new(Some(producer)),
            Err(e) => {
                tracing::warn!("Kafka unavailable, telemetry disabled: {}", e);
                Telemetry::disabled()
            }
        },
        None => Telemetry::disabled(),
    };

    let gateway: Arc<dyn PaymentGateway> = match config.payment.provider.as_str() {
        "stripe" => {
            let secret = config
                .payment
                .stripe_secret_key
                .clone()
                .expect("payment.stripe_secret_key required when provider is stripe");
            Arc::new(StripeGateway::new(secret))
        }
        _ => {
            tracing::warn!("Using mock payment gateway");
            Arc::new(MockGateway)
        }
    };

    let catalog = Arc::new(PgCatalogRepository::new(db.pool.clone()));
    let orders = Arc::new(PgOrderRepository::new(db.pool.clone()));
    let ledger = Arc::new(PgInventoryLedger::new(db.pool.clone()));

    let service = Arc::new(OrderService::new(
        catalog.clone(),
        orders.clone(),
        ledger,
        PaymentCoordinator::new(gateway),
        ShippingPolicy {
            fee_cents: config.business_rules.shipping_fee_cents,
            free_threshold_cents: config.business_rules.free_shipping_threshold_cents,
        },
        config.payment.currency.clone(),
    ));

    let app_state = AppState {
        service,
        orders,
        catalog,
        telemetry: Arc::new(telemetry),
        redis,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
        resiliency: Arc::new(Resiliency::new()),
        rate_limit_per_minute: config.business_rules.rate_limit_per_minute,
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}
