//! Order submission and retrieval handlers.
//!
//! Grounded on the teacher's `gateway/handlers/order.rs::create_order` (validate → generate id →
//! push to queue → return immediately) and `handlers.rs::get_orders`/`get_order`, adapted from the
//! matching-engine's `OrderAction`/`ArrayQueue` plumbing to `OrderIntake` and `PriorityJobQueue`.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::core_types::{AuthenticatedUser, OrderId};
use crate::intake::OrderIntake;
use crate::order::OrderStore;
use crate::stock::StockStore;

use super::super::state::AppState;
use super::super::types::{ApiError, ApiResponse, OrderResponseData, SubmitOrderRequest};

/// Assembles the client-facing order view: the order row, joined with a fresh stock read, the
/// product's display fields, and the job's attempt count.
async fn assemble_response(
    state: &AppState,
    order: crate::order::Order,
) -> Result<OrderResponseData, ApiError> {
    let stock = state.stock_store.read_stock(order.stock_id).await?;
    let product = state.product_catalog.get(order.product_id)?;
    let attempts = state
        .queue
        .find_by_order(order.id)
        .map(|job| job.attempts)
        .unwrap_or(0);
    Ok(OrderResponseData::assemble(
        order,
        product.name,
        product.description,
        stock.quantity,
        attempts,
    ))
}

/// Submit a new order.
///
/// POST /api/v1/orders
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = SubmitOrderRequest,
    responses(
        (status = 201, description = "Order accepted, PENDING", body = ApiResponse<OrderResponseData>),
        (status = 400, description = "Invalid parameters"),
        (status = 401, description = "Authentication failed"),
        (status = 500, description = "Enqueue or store failure")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn submit_order(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(req): Json<SubmitOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderResponseData>>), ApiError> {
    let stock = state.stock_store.read_stock(req.stock_id).await?;
    let intake = OrderIntake::new(
        state.stock_store.clone(),
        state.order_store.clone(),
        state.queue.clone(),
    );
    let order = intake
        .submit(
            user,
            stock.product_id,
            req.stock_id,
            req.quantity,
            req.price_at_purchase,
        )
        .await?;
    let response = assemble_response(&state, order).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(response))))
}

/// List the authenticated user's orders, newest first.
///
/// GET /api/v1/orders
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    responses(
        (status = 200, description = "Orders for the authenticated user", body = ApiResponse<Vec<OrderResponseData>>)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<Vec<OrderResponseData>>>, ApiError> {
    let orders = state.order_store.list_orders_by_user(user.id).await;
    let mut out = Vec::with_capacity(orders.len());
    for order in orders {
        out.push(assemble_response(&state, order).await?);
    }
    Ok(Json(ApiResponse::success(out)))
}

/// Fetch a single order by id.
///
/// GET /api/v1/orders/{order_id}
#[utoipa::path(
    get,
    path = "/api/v1/orders/{order_id}",
    responses(
        (status = 200, description = "Order found", body = ApiResponse<OrderResponseData>),
        (status = 404, description = "No such order")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    Extension(_user): Extension<AuthenticatedUser>,
    Path(order_id): Path<OrderId>,
) -> Result<Json<ApiResponse<OrderResponseData>>, ApiError> {
    let order = state.order_store.get_order(order_id).await?;
    let response = assemble_response(&state, order).await?;
    Ok(Json(ApiResponse::success(response)))
}
