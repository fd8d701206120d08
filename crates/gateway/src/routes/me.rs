use axum::{extract::Query, extract::State, http::HeaderMap, Json};
use cleancycle_database::{ActivityLog, PreferencesUpdate, ProfileUpdate, User, UserPreferences};
use cleancycle_laundry::{ChangePasswordRequest, LifetimeStats};

use crate::{
    error::ErrorResponse, routes::auth::MessageResponse, util::PageQuery, ApiError, AppState,
};

#[utoipa::path(
    get,
    path = "/api/me",
    tag = "Profile",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Current user's profile", body = User),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    )
)]
pub async fn get_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<User>, ApiError> {
    let user = state.current_user(&headers).await?;
    Ok(Json(state.services().users.profile(&user).await?))
}

#[utoipa::path(
    put,
    path = "/api/me",
    tag = "Profile",
    security(("bearerAuth" = [])),
    request_body = ProfileUpdate,
    responses(
        (status = 200, description = "Profile updated", body = User),
        (status = 400, description = "Empty or invalid update", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Unknown room", body = ErrorResponse)
    )
)]
pub async fn update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<User>, ApiError> {
    let user = state.current_user(&headers).await?;
    Ok(Json(state.services().users.update_profile(&user, &update).await?))
}

#[utoipa::path(
    get,
    path = "/api/me/preferences",
    tag = "Profile",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Notification and language preferences", body = UserPreferences),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    )
)]
pub async fn get_preferences(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserPreferences>, ApiError> {
    let user = state.current_user(&headers).await?;
    Ok(Json(state.services().users.preferences(&user).await?))
}

#[utoipa::path(
    put,
    path = "/api/me/preferences",
    tag = "Profile",
    security(("bearerAuth" = [])),
    request_body = PreferencesUpdate,
    responses(
        (status = 200, description = "Preferences updated", body = UserPreferences),
        (status = 400, description = "Unsupported language or reminder lead time", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    )
)]
pub async fn update_preferences(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(update): Json<PreferencesUpdate>,
) -> Result<Json<UserPreferences>, ApiError> {
    let user = state.current_user(&headers).await?;
    Ok(Json(
        state
            .services()
            .users
            .update_preferences(&user, &update)
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/me/password",
    tag = "Profile",
    security(("bearerAuth" = [])),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "New password too weak", body = ErrorResponse),
        (status = 401, description = "Current password is wrong", body = ErrorResponse)
    )
)]
pub async fn change_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user = state.current_user(&headers).await?;
    state
        .services()
        .users
        .change_password(&user, &request.current_password, &request.new_password)
        .await?;
    Ok(MessageResponse::new("Password changed"))
}

#[utoipa::path(
    get,
    path = "/api/me/statistics",
    tag = "Profile",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Lifetime usage totals", body = LifetimeStats),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    )
)]
pub async fn statistics(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<LifetimeStats>, ApiError> {
    let user = state.current_user(&headers).await?;
    Ok(Json(state.services().users.statistics(&user).await?))
}

#[utoipa::path(
    get,
    path = "/api/me/activity",
    tag = "Profile",
    security(("bearerAuth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Own activity, newest first", body = [ActivityLog]),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    )
)]
pub async fn activity(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<ActivityLog>>, ApiError> {
    let user = state.current_user(&headers).await?;
    Ok(Json(state.services().users.activity(&user, page.limit).await?))
}
