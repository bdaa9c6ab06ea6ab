//! Catalog / stock administration (§4.8): plain CRUD over products, outside the hot order path.
//! Mutations here are last-write-wins and never touch the CAS-guarded `quantity`/`version` fields
//! except through `StockStore::create`, which seeds a brand new stock row.

use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode};

use crate::core_types::AuthenticatedUser;
use crate::stock::{Product, StockStore};

use super::super::cache::load_products_with_stock_cached;
use super::super::state::AppState;
use super::super::types::{ApiError, ApiResponse, CreateProductRequest, ProductWithStockResponse};

/// Create a product and its initial stock row.
///
/// POST /api/v1/products
#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product and stock created", body = ApiResponse<ProductWithStockResponse>),
        (status = 400, description = "Invalid parameters")
    ),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    Extension(_admin): Extension<AuthenticatedUser>,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ProductWithStockResponse>>), ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError(crate::error::CoreError::Validation(
            "product name must not be empty".into(),
        )));
    }
    if req.unit_price.is_sign_negative() {
        return Err(ApiError(crate::error::CoreError::Validation(
            "unit price must not be negative".into(),
        )));
    }

    let product = Product {
        id: crate::core_types::ProductId::new(),
        name: req.name,
        description: req.description,
        unit_price: req.unit_price,
    };
    state.product_catalog.insert(product.clone());
    if let Some(repo) = state.stock_repo.as_ref() {
        if let Err(e) = repo.insert_product(&product).await {
            tracing::warn!("failed to mirror new product to postgres: {e}");
        }
    }

    // `stock_store.create` mirrors the new row to Postgres itself when the store was built
    // `with_repository`, so there is no separate mirror call here (it would double-insert).
    let stock_id = state
        .stock_store
        .create(product.id, req.initial_quantity)
        .await;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(ProductWithStockResponse {
            product_id: product.id,
            stock_id,
            name: product.name,
            description: product.description,
            unit_price: product.unit_price,
            quantity: req.initial_quantity,
            version: 0,
        })),
    ))
}

/// Browse the catalog: every product joined with its current stock snapshot. Cached briefly
/// (see [`super::super::cache`]) since this is a read-mostly, high-traffic endpoint.
///
/// GET /api/v1/products-with-stock
#[utoipa::path(
    get,
    path = "/api/v1/products-with-stock",
    responses(
        (status = 200, description = "Product catalog with current stock", body = ApiResponse<Vec<ProductWithStockResponse>>)
    ),
    tag = "Catalog"
)]
pub async fn list_products_with_stock(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<ProductWithStockResponse>>>, ApiError> {
    let rows = load_products_with_stock_cached(state.product_catalog.clone(), state.stock_store.clone())
        .await
        .map_err(|e| ApiError(crate::error::CoreError::Critical(e)))?;
    Ok(Json(ApiResponse::success(rows)))
}
