use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

/// One line of an inventory mutation, keyed by (product, color, size).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockLine {
    pub product_id: Uuid,
    pub color_id: Uuid,
    pub size_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("Variant not found for product {product_id} (color {color_id}, size {size_id})")]
    VariantNotFound {
        product_id: Uuid,
        color_id: Uuid,
        size_id: Uuid,
    },

    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: Uuid,
        color_id: Uuid,
        size_id: Uuid,
        requested: i32,
        available: i32,
    },

    #[error("Inventory backend error: {0}")]
    Backend(String),
}

/// Per-variant stock ledger.
///
/// `reserve` is all-or-nothing: if any line cannot be satisfied the whole
/// batch is rejected and no line is applied. `reduce_on_fulfillment` floors
/// at zero instead of failing, so status-driven decrements tolerate drift.
/// `restore` increments unconditionally.
#[async_trait]
pub trait InventoryLedger: Send + Sync {
    async fn reserve(&self, lines: &[StockLine]) -> Result<(), InventoryError>;

    async fn restore(&self, lines: &[StockLine]) -> Result<(), InventoryError>;

    async fn reduce_on_fulfillment(&self, lines: &[StockLine]) -> Result<(), InventoryError>;
}

/// In-memory ledger. Backs unit tests; the production ledger lives in the
/// store crate on top of atomic conditional updates.
pub struct MemoryLedger {
    stocks: Mutex<HashMap<(Uuid, Uuid, Uuid), i32>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            stocks: Mutex::new(HashMap::new()),
        }
    }

    pub async fn set_stock(&self, product_id: Uuid, color_id: Uuid, size_id: Uuid, stock: i32) {
        self.stocks
            .lock()
            .await
            .insert((product_id, color_id, size_id), stock);
    }

    pub async fn stock(&self, product_id: Uuid, color_id: Uuid, size_id: Uuid) -> Option<i32> {
        self.stocks
            .lock()
            .await
            .get(&(product_id, color_id, size_id))
            .copied()
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InventoryLedger for MemoryLedger {
    async fn reserve(&self, lines: &[StockLine]) -> Result<(), InventoryError> {
        let mut stocks = self.stocks.lock().await;

        // Validate the whole batch before touching anything.
        for line in lines {
            let key = (line.product_id, line.color_id, line.size_id);
            let available = *stocks.get(&key).ok_or(InventoryError::VariantNotFound {
                product_id: line.product_id,
                color_id: line.color_id,
                size_id: line.size_id,
            })?;

            if available < line.quantity {
                return Err(InventoryError::InsufficientStock {
                    product_id: line.product_id,
                    color_id: line.color_id,
                    size_id: line.size_id,
                    requested: line.quantity,
                    available,
                });
            }
        }

        for line in lines {
            let key = (line.product_id, line.color_id, line.size_id);
            *stocks.get_mut(&key).unwrap() -= line.quantity;
        }

        Ok(())
    }

    async fn restore(&self, lines: &[StockLine]) -> Result<(), InventoryError> {
        let mut stocks = self.stocks.lock().await;
        for line in lines {
            let key = (line.product_id, line.color_id, line.size_id);
            *stocks.entry(key).or_insert(0) += line.quantity;
        }
        Ok(())
    }

    async fn reduce_on_fulfillment(&self, lines: &[StockLine]) -> Result<(), InventoryError> {
        let mut stocks = self.stocks.lock().await;
        for line in lines {
            let key = (line.product_id, line.color_id, line.size_id);
            let entry = stocks.entry(key).or_insert(0);
            *entry = (*entry - line.quantity).max(0);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product_id: Uuid, color_id: Uuid, size_id: Uuid, quantity: i32) -> StockLine {
        StockLine {
            product_id,
            color_id,
            size_id,
            quantity,
        }
    }

    #[tokio::test]
    async fn test_reserve_decrements_stock() {
        let ledger = MemoryLedger::new();
        let (p, c, s) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        ledger.set_stock(p, c, s, 5).await;

        ledger.reserve(&[line(p, c, s, 3)]).await.unwrap();
        assert_eq!(ledger.stock(p, c, s).await, Some(2));
    }

    #[tokio::test]
    async fn test_reserve_reports_available_vs_requested() {
        let ledger = MemoryLedger::new();
        let (p, c, s) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        ledger.set_stock(p, c, s, 2).await;

        let err = ledger.reserve(&[line(p, c, s, 3)]).await.unwrap_err();
        match err {
            InventoryError::InsufficientStock {
                requested,
                available,
                ..
            } => {
                assert_eq!(requested, 3);
                assert_eq!(available, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // Nothing applied.
        assert_eq!(ledger.stock(p, c, s).await, Some(2));
    }

    #[tokio::test]
    async fn test_reserve_is_all_or_nothing_across_lines() {
        let ledger = MemoryLedger::new();
        let (p, c1, c2, s) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        ledger.set_stock(p, c1, s, 10).await;
        ledger.set_stock(p, c2, s, 1).await;

        let result = ledger
            .reserve(&[line(p, c1, s, 4), line(p, c2, s, 2)])
            .await;
        assert!(result.is_err());
        assert_eq!(ledger.stock(p, c1, s).await, Some(10));
        assert_eq!(ledger.stock(p, c2, s).await, Some(1));
    }

    #[tokio::test]
    async fn test_reduce_on_fulfillment_floors_at_zero() {
        let ledger = MemoryLedger::new();
        let (p, c, s) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        ledger.set_stock(p, c, s, 2).await;

        ledger
            .reduce_on_fulfillment(&[line(p, c, s, 5)])
            .await
            .unwrap();
        assert_eq!(ledger.stock(p, c, s).await, Some(0));
    }

    #[tokio::test]
    async fn test_restore_increments_unconditionally() {
        let ledger = MemoryLedger::new();
        let (p, c, s) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        ledger.set_stock(p, c, s, 0).await;

        ledger.restore(&[line(p, c, s, 4)]).await.unwrap();
        assert_eq!(ledger.stock(p, c, s).await, Some(4));
    }

    #[tokio::test]
    async fn test_stock_never_goes_negative() {
        let ledger = MemoryLedger::new();
        let (p, c, s) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        ledger.set_stock(p, c, s, 3).await;

        ledger.reserve(&[line(p, c, s, 2)]).await.unwrap();
        assert!(ledger.reserve(&[line(p, c, s, 2)]).await.is_err());
        ledger
            .reduce_on_fulfillment(&[line(p, c, s, 9)])
            .await
            .unwrap();

        assert_eq!(ledger.stock(p, c, s).await, Some(0));
    }
}
