use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use cleancycle_laundry::{DashboardStats, UsageStats};

use crate::{error::ErrorResponse, routes::machines::DaysQuery, ApiError, AppState};

#[utoipa::path(
    get,
    path = "/api/statistics/me",
    tag = "Statistics",
    security(("bearerAuth" = [])),
    params(DaysQuery),
    responses(
        (status = 200, description = "Own usage over the window", body = UsageStats),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    )
)]
pub async fn my_usage(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DaysQuery>,
) -> Result<Json<UsageStats>, ApiError> {
    let user = state.current_user(&headers).await?;
    Ok(Json(
        state
            .services()
            .statistics
            .user_usage(&user, query.days)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/statistics/dashboard",
    tag = "Statistics",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Machine status counts, user and active session totals", body = DashboardStats),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    )
)]
pub async fn dashboard(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DashboardStats>, ApiError> {
    state.current_user(&headers).await?;
    Ok(Json(state.services().statistics.dashboard().await?))
}
