use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use cleancycle_database::{Notification, NotificationLog};
use cleancycle_laundry::NotificationList;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{error::ErrorResponse, routes::machines::LimitQuery, ApiError, AppState};

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkUpdateResponse {
    pub updated: u64,
}

#[utoipa::path(
    get,
    path = "/api/notifications",
    tag = "Notifications",
    security(("bearerAuth" = [])),
    params(LimitQuery),
    responses(
        (status = 200, description = "Notifications, newest first, with the unread count", body = NotificationList),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    )
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LimitQuery>,
) -> Result<Json<NotificationList>, ApiError> {
    let user = state.current_user(&headers).await?;
    Ok(Json(
        state
            .services()
            .notifications
            .list(&user, query.limit)
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/notifications/{notification_id}/read",
    tag = "Notifications",
    security(("bearerAuth" = [])),
    params(("notification_id" = i64, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Notification marked read", body = Notification),
        (status = 404, description = "Notification not found", body = ErrorResponse)
    )
)]
pub async fn mark_notification_read(
    State(state): State<AppState>,
    Path(notification_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Notification>, ApiError> {
    let user = state.current_user(&headers).await?;
    Ok(Json(
        state
            .services()
            .notifications
            .mark_read(&user, notification_id)
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/notifications/read-all",
    tag = "Notifications",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Count of notifications marked read", body = BulkUpdateResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    )
)]
pub async fn mark_all_read(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<BulkUpdateResponse>, ApiError> {
    let user = state.current_user(&headers).await?;
    let updated = state.services().notifications.mark_all_read(&user).await?;
    Ok(Json(BulkUpdateResponse { updated }))
}

#[utoipa::path(
    delete,
    path = "/api/notifications/{notification_id}",
    tag = "Notifications",
    security(("bearerAuth" = [])),
    params(("notification_id" = i64, Path, description = "Notification id")),
    responses(
        (status = 204, description = "Notification deleted"),
        (status = 404, description = "Notification not found", body = ErrorResponse)
    )
)]
pub async fn delete_notification(
    State(state): State<AppState>,
    Path(notification_id): Path<i64>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let user = state.current_user(&headers).await?;
    state
        .services()
        .notifications
        .delete(&user, notification_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/notifications/logs",
    tag = "Notifications",
    security(("bearerAuth" = [])),
    params(LimitQuery),
    responses(
        (status = 200, description = "Per-channel delivery logs", body = [NotificationLog]),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    )
)]
pub async fn notification_logs(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<NotificationLog>>, ApiError> {
    let user = state.current_user(&headers).await?;
    Ok(Json(
        state
            .services()
            .notifications
            .logs(&user, query.limit)
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/notifications/logs/{log_id}/read",
    tag = "Notifications",
    security(("bearerAuth" = [])),
    params(("log_id" = i64, Path, description = "Notification log id")),
    responses(
        (status = 200, description = "Log entry marked read", body = NotificationLog),
        (status = 404, description = "Log entry not found", body = ErrorResponse)
    )
)]
pub async fn mark_log_read(
    State(state): State<AppState>,
    Path(log_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<NotificationLog>, ApiError> {
    let user = state.current_user(&headers).await?;
    Ok(Json(
        state
            .services()
            .notifications
            .mark_log_read(&user, log_id)
            .await?,
    ))
}
