use axum::{Json, extract::State, http::StatusCode};
use std::sync::Arc;

use super::service::{AuthResponse, LoginRequest, RegisterRequest};
use crate::gateway::types::error_codes;
use crate::gateway::{state::AppState, types::ApiResponse};

/// Register a new user.
///
/// POST /api/v1/auth/register
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = ApiResponse<i64>),
        (status = 400, description = "Invalid input or user already exists"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<i64>>), (StatusCode, Json<ApiResponse<()>>)> {
    if req.email.is_empty() || req.password.len() < 8 {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<()>::error(
                error_codes::INVALID_PARAMETER,
                "invalid email or password (min 8 chars)",
            )),
        ));
    }

    let user_auth = state.user_auth.as_ref().ok_or((
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ApiResponse::<()>::error(
            error_codes::INTERNAL_ERROR,
            "auth service unavailable",
        )),
    ))?;

    match user_auth.register(req).await {
        Ok(user_id) => Ok((StatusCode::CREATED, Json(ApiResponse::success(user_id)))),
        Err(e) => {
            let err_msg = e.to_string();
            if err_msg.contains("duplicate key") {
                tracing::warn!("registration attempt for existing user: {}", err_msg);
                Err((
                    StatusCode::CONFLICT,
                    Json(ApiResponse::<()>::error(
                        error_codes::INVALID_PARAMETER,
                        "username or email already exists",
                    )),
                ))
            } else {
                tracing::error!("registration failed: {:?}", e);
                Err((
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiResponse::<()>::error(
                        error_codes::INTERNAL_ERROR,
                        "registration failed",
                    )),
                ))
            }
        }
    }
}

/// Login and issue a JWT.
///
/// POST /api/v1/auth/login
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = ApiResponse<AuthResponse>),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthResponse>>), (StatusCode, Json<ApiResponse<()>>)> {
    let user_auth = state.user_auth.as_ref().ok_or((
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ApiResponse::<()>::error(
            error_codes::INTERNAL_ERROR,
            "auth service unavailable",
        )),
    ))?;

    match user_auth.login(req).await {
        Ok(resp) => Ok((StatusCode::OK, Json(ApiResponse::success(resp)))),
        Err(e) => {
            tracing::warn!("login failed: {:?}", e);
            Err((
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::<()>::error(
                    error_codes::AUTH_FAILED,
                    "invalid email or password",
                )),
            ))
        }
    }
}
