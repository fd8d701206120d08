//! Staff endpoints. Role checks happen in the service layer except for the
//! manual sweep, which has no service-side actor.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};
use cleancycle_database::{
    ActivityFilter, ActivityLog, ActivityType, LaundrySession, Machine, MachineErrorRecord,
    MachineStatus, MaintenanceRecord, NewMachine, NewRoom, OperationLog, Reservation, Room, User,
};
use cleancycle_laundry::{
    CompleteMaintenanceRequest, PermissionChecker, RoleChangeRequest, StartMaintenanceRequest,
    StatusOverrideRequest, SweepReport,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::ErrorResponse, routes::machines::LimitQuery, routes::reservations::StatusQuery,
    util::PageQuery, ApiError, AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusOverrideResponse {
    pub machine: Machine,
    pub previous_status: MachineStatus,
    /// Sessions closed because the machine was forced free.
    pub closed_sessions: Vec<LaundrySession>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ActivityQuery {
    pub user_id: Option<i64>,
    pub machine_id: Option<i64>,
    pub action_type: Option<ActivityType>,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "Admin",
    security(("bearerAuth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "All users", body = [User]),
        (status = 403, description = "Manager or admin role required", body = ErrorResponse)
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<User>>, ApiError> {
    let actor = state.current_user(&headers).await?;
    Ok(Json(
        state
            .services()
            .users
            .list_users(&actor, page.limit, page.offset)
            .await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{public_id}/role",
    tag = "Admin",
    security(("bearerAuth" = [])),
    params(("public_id" = String, Path, description = "Public user id")),
    request_body = RoleChangeRequest,
    responses(
        (status = 200, description = "Role changed", body = User),
        (status = 403, description = "Admin role required, or changing own role", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
pub async fn change_role(
    State(state): State<AppState>,
    Path(public_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<RoleChangeRequest>,
) -> Result<Json<User>, ApiError> {
    let actor = state.current_user(&headers).await?;
    Ok(Json(
        state
            .services()
            .users
            .change_role(&actor, &public_id, request.role)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/admin/reservations",
    tag = "Admin",
    security(("bearerAuth" = [])),
    params(StatusQuery, PageQuery),
    responses(
        (status = 200, description = "Reservations of every user", body = [Reservation]),
        (status = 403, description = "Manager or admin role required", body = ErrorResponse)
    )
)]
pub async fn list_reservations(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(status): Query<StatusQuery>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<Reservation>>, ApiError> {
    let actor = state.current_user(&headers).await?;
    Ok(Json(
        state
            .services()
            .reservations
            .list_all(&actor, status.status, page.limit, page.offset)
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/admin/reservations/{reservation_id}/confirm",
    tag = "Admin",
    security(("bearerAuth" = [])),
    params(("reservation_id" = i64, Path, description = "Reservation id")),
    responses(
        (status = 200, description = "Reservation confirmed", body = Reservation),
        (status = 403, description = "Manager or admin role required", body = ErrorResponse),
        (status = 409, description = "Not pending, or overlaps a confirmed reservation", body = ErrorResponse)
    )
)]
pub async fn confirm_reservation(
    State(state): State<AppState>,
    Path(reservation_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Reservation>, ApiError> {
    let actor = state.current_user(&headers).await?;
    Ok(Json(
        state
            .services()
            .reservations
            .confirm(&actor, reservation_id)
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/admin/reservations/{reservation_id}/complete",
    tag = "Admin",
    security(("bearerAuth" = [])),
    params(("reservation_id" = i64, Path, description = "Reservation id")),
    responses(
        (status = 200, description = "Reservation completed", body = Reservation),
        (status = 403, description = "Manager or admin role required", body = ErrorResponse),
        (status = 409, description = "Reservation is not confirmed", body = ErrorResponse)
    )
)]
pub async fn complete_reservation(
    State(state): State<AppState>,
    Path(reservation_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Reservation>, ApiError> {
    let actor = state.current_user(&headers).await?;
    Ok(Json(
        state
            .services()
            .reservations
            .complete(&actor, reservation_id)
            .await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/admin/machines/{machine_id}/status",
    tag = "Admin",
    security(("bearerAuth" = [])),
    params(("machine_id" = i64, Path, description = "Machine id")),
    request_body = StatusOverrideRequest,
    responses(
        (status = 200, description = "Status overridden", body = StatusOverrideResponse),
        (status = 403, description = "Manager or admin role required", body = ErrorResponse),
        (status = 404, description = "Machine not found", body = ErrorResponse)
    )
)]
pub async fn override_status(
    State(state): State<AppState>,
    Path(machine_id): Path<i64>,
    headers: HeaderMap,
    Json(request): Json<StatusOverrideRequest>,
) -> Result<Json<StatusOverrideResponse>, ApiError> {
    let actor = state.current_user(&headers).await?;
    let result = state
        .services()
        .machines
        .override_status(&actor, machine_id, &request)
        .await?;

    Ok(Json(StatusOverrideResponse {
        machine: result.machine,
        previous_status: result.previous,
        closed_sessions: result.closed_sessions,
    }))
}

#[utoipa::path(
    post,
    path = "/api/admin/machines/{machine_id}/maintenance",
    tag = "Admin",
    security(("bearerAuth" = [])),
    params(("machine_id" = i64, Path, description = "Machine id")),
    request_body = StartMaintenanceRequest,
    responses(
        (status = 201, description = "Maintenance started, machine unavailable", body = MaintenanceRecord),
        (status = 403, description = "Manager or admin role required", body = ErrorResponse),
        (status = 409, description = "Machine is running", body = ErrorResponse)
    )
)]
pub async fn start_maintenance(
    State(state): State<AppState>,
    Path(machine_id): Path<i64>,
    headers: HeaderMap,
    Json(request): Json<StartMaintenanceRequest>,
) -> Result<(StatusCode, Json<MaintenanceRecord>), ApiError> {
    let actor = state.current_user(&headers).await?;
    let record = state
        .services()
        .machines
        .start_maintenance(&actor, machine_id, &request)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[utoipa::path(
    post,
    path = "/api/admin/maintenance/{maintenance_id}/complete",
    tag = "Admin",
    security(("bearerAuth" = [])),
    params(("maintenance_id" = i64, Path, description = "Maintenance record id")),
    request_body(content = CompleteMaintenanceRequest, description = "Optional closing notes"),
    responses(
        (status = 200, description = "Maintenance finished, machine free", body = MaintenanceRecord),
        (status = 404, description = "Maintenance record not found", body = ErrorResponse),
        (status = 409, description = "Already complete", body = ErrorResponse)
    )
)]
pub async fn complete_maintenance(
    State(state): State<AppState>,
    Path(maintenance_id): Path<i64>,
    headers: HeaderMap,
    body: Option<Json<CompleteMaintenanceRequest>>,
) -> Result<Json<MaintenanceRecord>, ApiError> {
    let actor = state.current_user(&headers).await?;
    let request = body.map(|Json(request)| request).unwrap_or_default();
    Ok(Json(
        state
            .services()
            .machines
            .complete_maintenance(&actor, maintenance_id, request.notes.as_deref())
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/admin/errors/{error_id}/resolve",
    tag = "Admin",
    security(("bearerAuth" = [])),
    params(("error_id" = i64, Path, description = "Machine error id")),
    responses(
        (status = 200, description = "Error resolved", body = MachineErrorRecord),
        (status = 404, description = "Error not found", body = ErrorResponse)
    )
)]
pub async fn resolve_error(
    State(state): State<AppState>,
    Path(error_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<MachineErrorRecord>, ApiError> {
    let actor = state.current_user(&headers).await?;
    Ok(Json(
        state
            .services()
            .machines
            .resolve_error(&actor, error_id)
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/admin/rooms",
    tag = "Admin",
    security(("bearerAuth" = [])),
    request_body = NewRoom,
    responses(
        (status = 201, description = "Room created", body = Room),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 409, description = "Room name taken", body = ErrorResponse)
    )
)]
pub async fn create_room(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(room): Json<NewRoom>,
) -> Result<(StatusCode, Json<Room>), ApiError> {
    let actor = state.current_user(&headers).await?;
    if room.name.trim().is_empty() {
        return Err(ApiError::bad_request("room name is required"));
    }
    let room = state.services().machines.create_room(&actor, &room).await?;
    Ok((StatusCode::CREATED, Json(room)))
}

#[utoipa::path(
    post,
    path = "/api/admin/machines",
    tag = "Admin",
    security(("bearerAuth" = [])),
    request_body = NewMachine,
    responses(
        (status = 201, description = "Machine created", body = Machine),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Room not found", body = ErrorResponse)
    )
)]
pub async fn create_machine(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(machine): Json<NewMachine>,
) -> Result<(StatusCode, Json<Machine>), ApiError> {
    let actor = state.current_user(&headers).await?;
    if machine.name.trim().is_empty() {
        return Err(ApiError::bad_request("machine name is required"));
    }
    let machine = state
        .services()
        .machines
        .create_machine(&actor, &machine)
        .await?;
    Ok((StatusCode::CREATED, Json(machine)))
}

#[utoipa::path(
    get,
    path = "/api/admin/logs",
    tag = "Admin",
    security(("bearerAuth" = [])),
    params(LimitQuery),
    responses(
        (status = 200, description = "Operational log rows, newest first", body = [OperationLog]),
        (status = 403, description = "Manager or admin role required", body = ErrorResponse)
    )
)]
pub async fn operation_logs(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<OperationLog>>, ApiError> {
    let actor = state.current_user(&headers).await?;
    Ok(Json(
        state
            .services()
            .activity
            .logs(&actor, query.limit)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/admin/activity",
    tag = "Admin",
    security(("bearerAuth" = [])),
    params(ActivityQuery),
    responses(
        (status = 200, description = "Filtered activity logs, newest first", body = [ActivityLog]),
        (status = 403, description = "Manager or admin role required", body = ErrorResponse)
    )
)]
pub async fn activity_logs(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<Vec<ActivityLog>>, ApiError> {
    let actor = state.current_user(&headers).await?;
    let filter = ActivityFilter {
        user_id: query.user_id,
        machine_id: query.machine_id,
        action_type: query.action_type,
        since: query.since,
    };
    Ok(Json(
        state
            .services()
            .activity
            .list(&actor, &filter, query.limit, query.offset)
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/admin/sweep",
    tag = "Admin",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Expired sessions, reminders and completions handled now", body = SweepReport),
        (status = 403, description = "Manager or admin role required", body = ErrorResponse)
    )
)]
pub async fn run_sweep(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SweepReport>, ApiError> {
    let actor = state.current_user(&headers).await?;
    PermissionChecker::require_staff(&actor)?;

    let report = state.services().sweep.run().await?;
    info!(actor = %actor.public_id, ?report, "manual sweep");
    Ok(Json(report))
}
