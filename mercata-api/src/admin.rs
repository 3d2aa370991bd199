use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::ApiError;
use crate::orders::success;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SetVariantStockRequest {
    /// Color id or display name.
    pub color: String,
    /// Size id or display name.
    pub size: String,
    pub stock: i32,
}

#[derive(Debug, Serialize)]
pub struct VariantStockResponse {
    pub product_id: Uuid,
    pub color_id: Uuid,
    pub size_id: Uuid,
    pub stock: i32,
}

#[derive(Debug, Serialize)]
pub struct ProductInventoryResponse {
    pub id: Uuid,
    pub name: String,
    pub available_for_sale: bool,
    pub inventory: i32,
    pub variants: Vec<VariantStockResponse>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /v1/admin/products/{id}/inventory
/// Product stock view for the dashboard: per-variant counts plus the
/// derived aggregate.
pub async fn get_product_inventory(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let product = state
        .catalog
        .get_product(product_id)
        .await
        .map_err(|e| ApiError::Internal(anyhow::Error::from_boxed(e)))?
        .ok_or_else(|| ApiError::NotFound(format!("Product {} not found", product_id)))?;

    let response = ProductInventoryResponse {
        id: product.id,
        name: product.name.clone(),
        available_for_sale: product.available_for_sale,
        inventory: product.inventory(),
        variants: product
            .variants
            .iter()
            .map(|v| VariantStockResponse {
                product_id: v.product_id,
                color_id: v.color_id,
                size_id: v.size_id,
                stock: v.stock,
            })
            .collect(),
    };

    Ok(success(response))
}

/// PUT /v1/admin/products/{id}/stock
/// Direct stock edit for one variant.
pub async fn set_variant_stock(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(req): Json<SetVariantStockRequest>,
) -> Result<Json<Value>, ApiError> {
    if req.stock < 0 {
        return Err(ApiError::Validation("Stock cannot be negative".to_string()));
    }

    let color = state
        .catalog
        .resolve_color(&req.color)
        .await
        .map_err(|e| ApiError::Internal(anyhow::Error::from_boxed(e)))?
        .ok_or_else(|| ApiError::Validation(format!("Unknown color '{}'", req.color)))?;

    let size = state
        .catalog
        .resolve_size(&req.size)
        .await
        .map_err(|e| ApiError::Internal(anyhow::Error::from_boxed(e)))?
        .ok_or_else(|| ApiError::Validation(format!("Unknown size '{}'", req.size)))?;

    let updated = state
        .catalog
        .set_variant_stock(product_id, color.id, size.id, req.stock)
        .await
        .map_err(|e| ApiError::Internal(anyhow::Error::from_boxed(e)))?;

    if !updated {
        return Err(ApiError::NotFound(format!(
            "Product {} has no {} / {} variant",
            product_id, color.name, size.name
        )));
    }

    Ok(success(VariantStockResponse {
        product_id,
        color_id: color.id,
        size_id: size.id,
        stock: req.stock,
    }))
}
