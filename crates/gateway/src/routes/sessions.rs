use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use cleancycle_database::LaundrySession;

use crate::{error::ErrorResponse, routes::machines::LimitQuery, ApiError, AppState};

#[utoipa::path(
    get,
    path = "/api/sessions",
    tag = "Sessions",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Own active sessions", body = [LaundrySession]),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    )
)]
pub async fn active_sessions(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<LaundrySession>>, ApiError> {
    let user = state.current_user(&headers).await?;
    Ok(Json(state.services().sessions.active(&user).await?))
}

#[utoipa::path(
    get,
    path = "/api/sessions/history",
    tag = "Sessions",
    security(("bearerAuth" = [])),
    params(LimitQuery),
    responses(
        (status = 200, description = "Own sessions, newest first", body = [LaundrySession]),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    )
)]
pub async fn session_history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<LaundrySession>>, ApiError> {
    let user = state.current_user(&headers).await?;
    Ok(Json(
        state.services().sessions.history(&user, query.limit).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{session_id}/finish",
    tag = "Sessions",
    security(("bearerAuth" = [])),
    params(("session_id" = i64, Path, description = "Laundry session id")),
    responses(
        (status = 200, description = "Session finished, machine freed", body = LaundrySession),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "Session no longer active", body = ErrorResponse)
    )
)]
pub async fn finish_session(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<LaundrySession>, ApiError> {
    let user = state.current_user(&headers).await?;
    Ok(Json(
        state.services().sessions.finish(&user, session_id).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{session_id}/cancel",
    tag = "Sessions",
    security(("bearerAuth" = [])),
    params(("session_id" = i64, Path, description = "Laundry session id")),
    responses(
        (status = 200, description = "Session cancelled, machine freed", body = LaundrySession),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "Session no longer active", body = ErrorResponse)
    )
)]
pub async fn cancel_session(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<LaundrySession>, ApiError> {
    let user = state.current_user(&headers).await?;
    Ok(Json(
        state.services().sessions.cancel(&user, session_id).await?,
    ))
}
