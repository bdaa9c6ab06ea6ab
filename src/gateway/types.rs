//! Request/response DTOs and the unified error/response envelope for the HTTP surface.
//!
//! Kept close to the teacher's `ApiResponse<T>` wrapper shape (`code`/`msg`/`data`), with
//! `ApiError` added as the single place `CoreError` gets mapped to an HTTP status, mirroring the
//! teacher's existing `From<_> for ApiError`-style conversions elsewhere in this codebase.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::core_types::{OrderId, ProductId, StockId};
use crate::error::CoreError;
use crate::order::{Order, OrderStatus};

/// Unified API response envelope. `code` is `0` on success, a stable non-zero machine-readable
/// code from [`error_codes`] otherwise.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 0,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(code: i32, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
            data: None,
        }
    }
}

pub mod error_codes {
    pub const SUCCESS: i32 = 0;
    pub const INVALID_PARAMETER: i32 = 1001;
    pub const INSUFFICIENT_STOCK: i32 = 1002;
    pub const MISSING_AUTH: i32 = 2001;
    pub const AUTH_FAILED: i32 = 2002;
    pub const ORDER_NOT_FOUND: i32 = 4001;
    pub const STOCK_NOT_FOUND: i32 = 4002;
    pub const ALREADY_TERMINAL: i32 = 4091;
    pub const INTERNAL_ERROR: i32 = 5001;
    pub const QUEUE_FULL: i32 = 5002;
}

/// The single place a [`CoreError`] becomes an HTTP response. §7's propagation policy: Validation
/// and NotFound surface synchronously with 4xx; everything the worker itself would treat as
/// transient or critical has no sensible synchronous status and maps to 500/503.
pub struct ApiError(pub CoreError);

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use error_codes::*;
        let (status, code) = match &self.0 {
            CoreError::Validation(_) => (StatusCode::BAD_REQUEST, INVALID_PARAMETER),
            CoreError::StockNotFound(_) => (StatusCode::NOT_FOUND, STOCK_NOT_FOUND),
            CoreError::OrderNotFound(_) => (StatusCode::NOT_FOUND, ORDER_NOT_FOUND),
            CoreError::Insufficient { .. } => (StatusCode::CONFLICT, INSUFFICIENT_STOCK),
            CoreError::VersionConflict(_) => (StatusCode::CONFLICT, INSUFFICIENT_STOCK),
            CoreError::AlreadyTerminal => (StatusCode::CONFLICT, ALREADY_TERMINAL),
            CoreError::TransientIo(_) => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR),
            CoreError::PaymentTimeout => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR),
            CoreError::QueueFull => (StatusCode::SERVICE_UNAVAILABLE, QUEUE_FULL),
            CoreError::Critical(_) => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR),
        };
        (status, Json(ApiResponse::<()>::error(code, self.0.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: CoreError) -> StatusCode {
        ApiError(err).into_response().status()
    }

    #[test]
    fn every_core_error_variant_maps_to_its_documented_status() {
        assert_eq!(
            status_of(CoreError::Validation("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(CoreError::StockNotFound(StockId::new())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(CoreError::OrderNotFound(OrderId::new())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(CoreError::Insufficient {
                requested: 5,
                available: 1
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(CoreError::VersionConflict(StockId::new())),
            StatusCode::CONFLICT
        );
        assert_eq!(status_of(CoreError::AlreadyTerminal), StatusCode::CONFLICT);
        assert_eq!(
            status_of(CoreError::TransientIo("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(CoreError::PaymentTimeout),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(CoreError::QueueFull),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(CoreError::Critical("fatal".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

/// `POST /orders` request body.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitOrderRequest {
    #[schema(value_type = String)]
    pub stock_id: StockId,
    pub quantity: u32,
    #[schema(value_type = String)]
    pub price_at_purchase: Decimal,
}

/// An order as returned to clients. Joins the order row with a fresh stock read and the
/// product's display fields, per §6's "Retrieval API" field list.
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponseData {
    #[schema(value_type = String)]
    pub id: OrderId,
    pub user_id: i64,
    pub product_name: String,
    pub product_description: Option<String>,
    pub available_stock: u32,
    pub quantity: u32,
    #[schema(value_type = String)]
    pub price_at_purchase: Decimal,
    pub status: OrderStatus,
    pub is_vip_order: bool,
    pub failure_reason: Option<String>,
    /// Observability-only, per the spec's explicit allowance; never used for correctness
    /// decisions.
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderResponseData {
    pub fn assemble(
        order: Order,
        product_name: String,
        product_description: Option<String>,
        available_stock: u32,
        attempts: u32,
    ) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id.0,
            product_name,
            product_description,
            available_stock,
            quantity: order.quantity,
            price_at_purchase: order.price_at_purchase,
            status: order.status,
            is_vip_order: order.is_vip,
            failure_reason: order.failure_reason,
            attempts,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

/// Admin-facing catalog CRUD (§4.8) — product creation.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    #[schema(value_type = String)]
    pub unit_price: Decimal,
    pub initial_quantity: u32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductWithStockResponse {
    #[schema(value_type = String)]
    pub product_id: ProductId,
    #[schema(value_type = String)]
    pub stock_id: StockId,
    pub name: String,
    pub description: Option<String>,
    #[schema(value_type = String)]
    pub unit_price: Decimal,
    pub quantity: u32,
    pub version: u64,
}
