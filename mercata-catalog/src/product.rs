use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A color a product can be ordered in. Customers may submit either the
/// canonical id or the display name; resolution happens at order creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Color {
    pub id: Uuid,
    pub name: String,
}

/// A size a product can be ordered in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Size {
    pub id: Uuid,
    pub name: String,
}

/// A (color, size) combination of a product — the unit at which stock is tracked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Variant {
    pub product_id: Uuid,
    pub color_id: Uuid,
    pub size_id: Uuid,
    pub stock: i32,
}

/// Core product structure with its embedded variant set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i32,
    pub available_for_sale: bool,
    pub variants: Vec<Variant>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Product {
    /// Aggregate inventory across all variants. Derived, never stored.
    pub fn inventory(&self) -> i32 {
        self.variants.iter().map(|v| v.stock).sum()
    }

    /// What `available_for_sale` should read given the current variant stocks.
    pub fn computed_availability(&self) -> bool {
        self.variants.iter().any(|v| v.stock > 0)
    }

    pub fn variant(&self, color_id: Uuid, size_id: Uuid) -> Option<&Variant> {
        self.variants
            .iter()
            .find(|v| v.color_id == color_id && v.size_id == size_id)
    }
}
