//! OpenAPI / Swagger UI documentation.
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use super::handlers::catalog::{create_product, list_products_with_stock};
use super::handlers::health::{HealthResponse, health_check};
use super::handlers::order::{get_order, list_orders, submit_order};
use super::types::{CreateProductRequest, OrderResponseData, ProductWithStockResponse, SubmitOrderRequest};
use crate::user_auth::handlers::{login, register};
use crate::user_auth::service::{AuthResponse, LoginRequest, RegisterRequest};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Order Processing Core API",
        version = "1.0.0",
        description = "Concurrent order-processing core: priority queue, CAS-guarded stock reservation, order state machine.",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        health_check,
        register,
        login,
        submit_order,
        list_orders,
        get_order,
        create_product,
        list_products_with_stock,
    ),
    components(
        schemas(
            HealthResponse,
            RegisterRequest,
            LoginRequest,
            AuthResponse,
            SubmitOrderRequest,
            OrderResponseData,
            CreateProductRequest,
            ProductWithStockResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "System", description = "Health checks"),
        (name = "Auth", description = "Registration and login"),
        (name = "Orders", description = "Order submission and retrieval (auth required)"),
        (name = "Catalog", description = "Product/stock administration and browsing")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_spec_generates() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "Order Processing Core API");
    }

    #[test]
    fn openapi_json_serializable() {
        let spec = ApiDoc::openapi();
        assert!(spec.to_json().is_ok());
    }

    #[test]
    fn security_scheme_registered() {
        let spec = ApiDoc::openapi();
        let components = spec.components.expect("should have components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
