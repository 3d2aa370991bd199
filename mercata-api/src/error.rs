use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use mercata_catalog::inventory::InventoryError;
use mercata_order::service::OrderError;

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    Forbidden(String),
    Validation(String),
    NotFound(String),
    Conflict(String),
    Payment(String),
    Internal(anyhow::Error),
}

impl ApiError {
    pub fn internal<E: Into<anyhow::Error>>(e: E) -> Self {
        Self::Internal(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Payment(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "success": false,
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<OrderError> for ApiError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::Validation(msg) => ApiError::Validation(msg),
            OrderError::NotFound(msg) => ApiError::NotFound(msg),
            OrderError::Inventory(inner) => match inner {
                InventoryError::InsufficientStock { .. } => ApiError::Validation(inner.to_string()),
                InventoryError::VariantNotFound { .. } => ApiError::NotFound(inner.to_string()),
                InventoryError::Backend(msg) => ApiError::Internal(anyhow::anyhow!(msg)),
            },
            OrderError::Payment(inner) => ApiError::Payment(inner.to_string()),
            OrderError::Transition { from, to } => {
                ApiError::Conflict(format!("Invalid state transition from {} to {}", from, to))
            }
            OrderError::Repo(msg) => ApiError::Internal(anyhow::anyhow!(msg)),
        }
    }
}
