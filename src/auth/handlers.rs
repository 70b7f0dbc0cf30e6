// HTTP handlers for authentication endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::auth::{
    middleware::AuthenticatedPrincipal,
    models::{AuthResponse, LoginRequest, MessageResponse, PrincipalResponse, RegisterRequest},
};
use crate::error::ApiError;
use crate::AppState;

/// Register a new customer
/// POST /api/auth/register
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Principal created, session token issued", body = AuthResponse),
        (status = 400, description = "Missing or invalid fields", body = crate::error::ErrorResponse),
        (status = 409, description = "Username or email already exists", body = crate::error::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register_handler(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let Json(request) = payload?;
    tracing::debug!("Registration attempt for username: {}", request.username);
    request.validate()?;

    let response = state
        .auth
        .register(&request.username, &request.email, &request.password)
        .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Log in with username and password
/// POST /api/auth/login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session token issued", body = AuthResponse),
        (status = 400, description = "Missing fields", body = crate::error::ErrorResponse),
        (status = 401, description = "Invalid username or password", body = crate::error::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login_handler(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(request) = payload?;
    request.validate()?;

    let response = state.auth.login(&request.username, &request.password).await?;
    Ok(Json(response))
}

/// Get the principal behind the bearer token
/// GET /api/auth/me
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current principal", body = PrincipalResponse),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorResponse),
        (status = 404, description = "Principal no longer exists", body = crate::error::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn me_handler(
    State(state): State<AppState>,
    principal: AuthenticatedPrincipal,
) -> Result<Json<PrincipalResponse>, ApiError> {
    let response = state.auth.current_principal(principal.principal_id).await?;
    Ok(Json(response))
}

/// Log out
/// POST /api/auth/logout
///
/// Tokens are stateless, so this only acknowledges; the client discards its token.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn logout_handler(principal: AuthenticatedPrincipal) -> Json<MessageResponse> {
    tracing::info!("Principal {} logged out", principal.principal_id);
    Json(MessageResponse {
        message: "Logged out".to_string(),
    })
}
