use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use mercata_catalog::product::{Color, Product, Size, Variant};
use mercata_catalog::repository::CatalogRepository;

use crate::inventory_repo::refresh_availability;

pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    price_cents: i32,
    available_for_sale: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct VariantRow {
    product_id: Uuid,
    color_id: Uuid,
    size_id: Uuid,
    stock: i32,
}

#[derive(sqlx::FromRow)]
struct NamedRow {
    id: Uuid,
    name: String,
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn get_product(
        &self,
        id: Uuid,
    ) -> Result<Option<Product>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, description, price_cents, available_for_sale, created_at, updated_at \
             FROM products WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let variants = sqlx::query_as::<_, VariantRow>(
            "SELECT product_id, color_id, size_id, stock FROM product_variants WHERE product_id = $1",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(Product {
            id: row.id,
            name: row.name,
            description: row.description,
            price_cents: row.price_cents,
            available_for_sale: row.available_for_sale,
            variants: variants
                .into_iter()
                .map(|v| Variant {
                    product_id: v.product_id,
                    color_id: v.color_id,
                    size_id: v.size_id,
                    stock: v.stock,
                })
                .collect(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }

    async fn resolve_color(
        &self,
        token: &str,
    ) -> Result<Option<Color>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query_as::<_, NamedRow>(
            "SELECT id, name FROM colors WHERE id::text = $1 OR LOWER(name) = LOWER($1)",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Color { id: r.id, name: r.name }))
    }

    async fn resolve_size(
        &self,
        token: &str,
    ) -> Result<Option<Size>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query_as::<_, NamedRow>(
            "SELECT id, name FROM sizes WHERE id::text = $1 OR LOWER(name) = LOWER($1)",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Size { id: r.id, name: r.name }))
    }

    async fn set_variant_stock(
        &self,
        product_id: Uuid,
        color_id: Uuid,
        size_id: Uuid,
        stock: i32,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE product_variants SET stock = $1 \
             WHERE product_id = $2 AND color_id = $3 AND size_id = $4",
        )
        .bind(stock)
        .bind(product_id)
        .bind(color_id)
        .bind(size_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            return Ok(false);
        }

        refresh_availability(&mut tx, product_id).await?;
        tx.commit().await?;
        Ok(true)
    }
}
