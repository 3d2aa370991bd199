use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use mercata_catalog::inventory::{InventoryError, InventoryLedger, StockLine};

fn backend(e: sqlx::Error) -> InventoryError {
    InventoryError::Backend(e.to_string())
}

/// Conditional decrement as a single statement: the WHERE clause makes the
/// check-and-write atomic against concurrent writers, so overdraft is
/// bounded to zero.
pub(crate) async fn reserve_line(
    tx: &mut Transaction<'_, Postgres>,
    line: &StockLine,
) -> Result<(), InventoryError> {
    let updated = sqlx::query(
        "UPDATE product_variants SET stock = stock - $1 \
         WHERE product_id = $2 AND color_id = $3 AND size_id = $4 AND stock >= $1",
    )
    .bind(line.quantity)
    .bind(line.product_id)
    .bind(line.color_id)
    .bind(line.size_id)
    .execute(&mut **tx)
    .await
    .map_err(backend)?
    .rows_affected();

    if updated == 0 {
        // Distinguish a missing variant from insufficient stock so the
        // caller can report available-vs-requested counts.
        let available: Option<i32> = sqlx::query_scalar(
            "SELECT stock FROM product_variants \
             WHERE product_id = $1 AND color_id = $2 AND size_id = $3",
        )
        .bind(line.product_id)
        .bind(line.color_id)
        .bind(line.size_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(backend)?;

        return Err(match available {
            Some(available) => InventoryError::InsufficientStock {
                product_id: line.product_id,
                color_id: line.color_id,
                size_id: line.size_id,
                requested: line.quantity,
                available,
            },
            None => InventoryError::VariantNotFound {
                product_id: line.product_id,
                color_id: line.color_id,
                size_id: line.size_id,
            },
        });
    }

    Ok(())
}

/// Recompute the derived `available_for_sale` flag after a stock mutation.
pub(crate) async fn refresh_availability(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
) -> Result<(), InventoryError> {
    sqlx::query(
        "UPDATE products SET available_for_sale = EXISTS (\
             SELECT 1 FROM product_variants v WHERE v.product_id = products.id AND v.stock > 0\
         ), updated_at = NOW() WHERE id = $1",
    )
    .bind(product_id)
    .execute(&mut **tx)
    .await
    .map_err(backend)?;

    Ok(())
}

pub(crate) fn touched_products(lines: &[StockLine]) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
    ids.sort();
    ids.dedup();
    ids
}

/// Postgres-backed inventory ledger.
pub struct PgInventoryLedger {
    pool: PgPool,
}

impl PgInventoryLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InventoryLedger for PgInventoryLedger {
    async fn reserve(&self, lines: &[StockLine]) -> Result<(), InventoryError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        for line in lines {
            reserve_line(&mut tx, line).await?;
        }
        for product_id in touched_products(lines) {
            refresh_availability(&mut tx, product_id).await?;
        }

        tx.commit().await.map_err(backend)?;
        Ok(())
    }

    async fn restore(&self, lines: &[StockLine]) -> Result<(), InventoryError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        for line in lines {
            sqlx::query(
                "UPDATE product_variants SET stock = stock + $1 \
                 WHERE product_id = $2 AND color_id = $3 AND size_id = $4",
            )
            .bind(line.quantity)
            .bind(line.product_id)
            .bind(line.color_id)
            .bind(line.size_id)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        }
        for product_id in touched_products(lines) {
            refresh_availability(&mut tx, product_id).await?;
        }

        tx.commit().await.map_err(backend)?;
        Ok(())
    }

    async fn reduce_on_fulfillment(&self, lines: &[StockLine]) -> Result<(), InventoryError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        for line in lines {
            sqlx::query(
                "UPDATE product_variants SET stock = GREATEST(stock - $1, 0) \
                 WHERE product_id = $2 AND color_id = $3 AND size_id = $4",
            )
            .bind(line.quantity)
            .bind(line.product_id)
            .bind(line.color_id)
            .bind(line.size_id)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        }
        for product_id in touched_products(lines) {
            refresh_availability(&mut tx, product_id).await?;
        }

        tx.commit().await.map_err(backend)?;
        Ok(())
    }
}
