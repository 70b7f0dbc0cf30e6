// HTTP handlers for staff/admin notification endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::auth::middleware::AuthenticatedPrincipal;
use crate::error::ApiError;
use crate::notifications::{
    events::Target,
    hub::{DeliveryReport, HubStats},
};
use crate::AppState;

/// Body for POST /api/notifications
#[derive(Debug, Deserialize, ToSchema)]
pub struct SendNotificationRequest {
    /// `{"type":"principal","value":42}`, `{"type":"role","value":"staff"}` or `{"type":"all"}`
    #[schema(value_type = Object)]
    pub target: Target,
    #[schema(value_type = Object)]
    pub payload: Value,
}

/// Send a generic notification (staff or admin)
/// POST /api/notifications
#[utoipa::path(
    post,
    path = "/api/notifications",
    request_body = SendNotificationRequest,
    responses(
        (status = 200, description = "Event handed to bound channels", body = DeliveryReport),
        (status = 400, description = "Invalid target", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorResponse),
        (status = 403, description = "Role not permitted", body = crate::error::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "notifications"
)]
pub async fn send_notification_handler(
    State(state): State<AppState>,
    sender: AuthenticatedPrincipal,
    payload: Result<Json<SendNotificationRequest>, JsonRejection>,
) -> Result<Json<DeliveryReport>, ApiError> {
    let Json(request) = payload?;
    if let Target::Principal(id) = request.target {
        if id <= 0 {
            return Err(ApiError::BadRequest(format!("Invalid principal id {}", id)));
        }
    }

    tracing::info!(
        "Principal {} sending notification to {:?}",
        sender.principal_id,
        request.target
    );
    let report = state.notifier.notify(request.target, request.payload);
    Ok(Json(report))
}

/// Live connection counts (admin only)
/// GET /api/notifications/stats
#[utoipa::path(
    get,
    path = "/api/notifications/stats",
    responses(
        (status = 200, description = "Hub connection statistics", body = HubStats),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorResponse),
        (status = 403, description = "Role not permitted", body = crate::error::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "notifications"
)]
pub async fn hub_stats_handler(State(state): State<AppState>) -> Json<HubStats> {
    Json(state.hub.stats())
}
