pub mod cache;
pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use std::future::Future;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::error::CoreError;
use crate::user_auth::middleware::jwt_auth_middleware;
use state::AppState;

/// Assembles the full HTTP surface: public routes (health, auth, catalog browsing), JWT-protected
/// routes (order submission/retrieval, catalog admin), and the Swagger UI.
///
/// Grounded on the teacher's `run_server`'s public/private route split and
/// `from_fn_with_state(state, ..._auth_middleware)` layering, narrowed from the teacher's
/// Ed25519-signature scheme to bearer JWT.
pub fn build_router(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            "/auth/register",
            post(crate::user_auth::handlers::register),
        )
        .route("/auth/login", post(crate::user_auth::handlers::login))
        .route(
            "/products-with-stock",
            get(handlers::catalog::list_products_with_stock),
        );

    let protected_routes = Router::new()
        .route(
            "/orders",
            post(handlers::order::submit_order).get(handlers::order::list_orders),
        )
        .route("/orders/{order_id}", get(handlers::order::get_order))
        .route("/products", post(handlers::catalog::create_product))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_middleware,
        ));

    Router::new()
        .nest(
            "/api/v1",
            Router::new().merge(public_routes).merge(protected_routes),
        )
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
        .with_state(state)
}

/// Binds and serves the router until `shutdown` resolves, then returns once in-flight requests
/// have drained (axum's own graceful-shutdown support).
pub async fn serve(
    port: u16,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), CoreError> {
    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| CoreError::Critical(format!("failed to bind {addr}: {e}")))?;

    tracing::info!(%addr, "gateway listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| CoreError::Critical(format!("server error: {e}")))
}
