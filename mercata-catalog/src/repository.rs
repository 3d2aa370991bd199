use async_trait::async_trait;
use uuid::Uuid;
use crate::product::{Color, Product, Size};

/// Repository trait for product catalog access.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn get_product(
        &self,
        id: Uuid,
    ) -> Result<Option<Product>, Box<dyn std::error::Error + Send + Sync>>;

    /// Resolve a color token — either a canonical id or a display name.
    async fn resolve_color(
        &self,
        token: &str,
    ) -> Result<Option<Color>, Box<dyn std::error::Error + Send + Sync>>;

    /// Resolve a size token — either a canonical id or a display name.
    async fn resolve_size(
        &self,
        token: &str,
    ) -> Result<Option<Size>, Box<dyn std::error::Error + Send + Sync>>;

    /// Direct admin stock edit for one variant. Recomputes the product's
    /// availability flag. Returns false if the variant does not exist.
    async fn set_variant_stock(
        &self,
        product_id: Uuid,
        color_id: Uuid,
        size_id: Uuid,
        stock: i32,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;
}
