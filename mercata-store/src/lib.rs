pub mod app_config;
pub mod database;
pub mod redis_repo;
pub mod events;
pub mod telemetry;
pub mod catalog_repo;
pub mod inventory_repo;
pub mod order_repo;

pub use database::DbClient;
pub use redis_repo::RedisClient;
pub use events::EventProducer;
pub use telemetry::Telemetry;
pub use catalog_repo::PgCatalogRepository;
pub use inventory_repo::PgInventoryLedger;
pub use order_repo::PgOrderRepository;
