pub mod product;
pub mod inventory;
pub mod repository;

pub use product::{Product, Variant, Color, Size};
pub use inventory::{InventoryLedger, InventoryError, MemoryLedger, StockLine};
pub use repository::CatalogRepository;
