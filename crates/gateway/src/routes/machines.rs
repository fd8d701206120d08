//! Rooms, the machine grid, fault reports and starting a cycle.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};
use cleancycle_database::{
    LaundrySession, Machine, MachineErrorRecord, MachineType, MaintenanceRecord, Reservation,
    Room,
};
use cleancycle_laundry::{
    MachineDetail, MachineUsageStats, ReportErrorRequest, StartSessionRequest, StatusBreakdown,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{error::ErrorResponse, ApiError, AppState};

#[derive(Debug, Deserialize, IntoParams)]
pub struct SlotQuery {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(rename = "type")]
    pub machine_type: Option<MachineType>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct WindowQuery {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct DaysQuery {
    /// Window length in days, 30 when omitted.
    pub days: Option<i64>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/rooms",
    tag = "Machines",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "All laundry rooms", body = [Room]),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    )
)]
pub async fn list_rooms(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Room>>, ApiError> {
    state.current_user(&headers).await?;
    Ok(Json(state.services().machines.list_rooms().await?))
}

#[utoipa::path(
    get,
    path = "/api/rooms/{room_id}/machines",
    tag = "Machines",
    security(("bearerAuth" = [])),
    params(("room_id" = i64, Path, description = "Room id")),
    responses(
        (status = 200, description = "Machines in the room", body = [Machine]),
        (status = 404, description = "Room not found", body = ErrorResponse)
    )
)]
pub async fn room_machines(
    State(state): State<AppState>,
    Path(room_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Vec<Machine>>, ApiError> {
    state.current_user(&headers).await?;
    Ok(Json(state.services().machines.list_by_room(room_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/rooms/{room_id}/stats",
    tag = "Machines",
    security(("bearerAuth" = [])),
    params(("room_id" = i64, Path, description = "Room id")),
    responses(
        (status = 200, description = "Machine counts per status", body = StatusBreakdown),
        (status = 404, description = "Room not found", body = ErrorResponse)
    )
)]
pub async fn room_stats(
    State(state): State<AppState>,
    Path(room_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<StatusBreakdown>, ApiError> {
    state.current_user(&headers).await?;
    Ok(Json(state.services().statistics.room_stats(room_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/rooms/{room_id}/available",
    tag = "Machines",
    security(("bearerAuth" = [])),
    params(("room_id" = i64, Path, description = "Room id"), SlotQuery),
    responses(
        (status = 200, description = "Machines with no confirmed reservation in the window", body = [Machine]),
        (status = 400, description = "End is not after start", body = ErrorResponse)
    )
)]
pub async fn available_machines(
    State(state): State<AppState>,
    Path(room_id): Path<i64>,
    headers: HeaderMap,
    Query(slot): Query<SlotQuery>,
) -> Result<Json<Vec<Machine>>, ApiError> {
    state.current_user(&headers).await?;
    let machines = state
        .services()
        .machines
        .available_for_slot(room_id, slot.machine_type, slot.start, slot.end)
        .await?;
    Ok(Json(machines))
}

#[utoipa::path(
    get,
    path = "/api/machines",
    tag = "Machines",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Every machine", body = [Machine]),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    )
)]
pub async fn list_machines(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Machine>>, ApiError> {
    state.current_user(&headers).await?;
    Ok(Json(state.services().machines.list_all().await?))
}

#[utoipa::path(
    get,
    path = "/api/machines/{machine_id}",
    tag = "Machines",
    security(("bearerAuth" = [])),
    params(("machine_id" = i64, Path, description = "Machine id")),
    responses(
        (status = 200, description = "Machine with its unresolved errors", body = MachineDetail),
        (status = 404, description = "Machine not found", body = ErrorResponse)
    )
)]
pub async fn get_machine(
    State(state): State<AppState>,
    Path(machine_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<MachineDetail>, ApiError> {
    state.current_user(&headers).await?;
    Ok(Json(
        state.services().machines.get_with_errors(machine_id).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/machines/{machine_id}/reservations",
    tag = "Machines",
    security(("bearerAuth" = [])),
    params(("machine_id" = i64, Path, description = "Machine id"), WindowQuery),
    responses(
        (status = 200, description = "Confirmed reservations inside the window, earliest first", body = [Reservation]),
        (status = 400, description = "End is not after start", body = ErrorResponse),
        (status = 404, description = "Machine not found", body = ErrorResponse)
    )
)]
pub async fn machine_reservations(
    State(state): State<AppState>,
    Path(machine_id): Path<i64>,
    headers: HeaderMap,
    Query(query): Query<WindowQuery>,
) -> Result<Json<Vec<Reservation>>, ApiError> {
    state.current_user(&headers).await?;
    let schedule = state
        .services()
        .reservations
        .machine_schedule(machine_id, query.start, query.end)
        .await?;
    Ok(Json(schedule))
}

#[utoipa::path(
    get,
    path = "/api/machines/{machine_id}/maintenance",
    tag = "Machines",
    security(("bearerAuth" = [])),
    params(("machine_id" = i64, Path, description = "Machine id"), LimitQuery),
    responses(
        (status = 200, description = "Maintenance history, newest first", body = [MaintenanceRecord]),
        (status = 404, description = "Machine not found", body = ErrorResponse)
    )
)]
pub async fn maintenance_history(
    State(state): State<AppState>,
    Path(machine_id): Path<i64>,
    headers: HeaderMap,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<MaintenanceRecord>>, ApiError> {
    state.current_user(&headers).await?;
    let history = state
        .services()
        .machines
        .maintenance_history(machine_id, query.limit)
        .await?;
    Ok(Json(history))
}

#[utoipa::path(
    get,
    path = "/api/machines/{machine_id}/stats",
    tag = "Machines",
    security(("bearerAuth" = [])),
    params(("machine_id" = i64, Path, description = "Machine id"), DaysQuery),
    responses(
        (status = 200, description = "Usage and utilization over the window", body = MachineUsageStats),
        (status = 404, description = "Machine not found", body = ErrorResponse)
    )
)]
pub async fn machine_stats(
    State(state): State<AppState>,
    Path(machine_id): Path<i64>,
    headers: HeaderMap,
    Query(query): Query<DaysQuery>,
) -> Result<Json<MachineUsageStats>, ApiError> {
    state.current_user(&headers).await?;
    let stats = state
        .services()
        .statistics
        .machine_usage(machine_id, query.days)
        .await?;
    Ok(Json(stats))
}

#[utoipa::path(
    post,
    path = "/api/machines/{machine_id}/errors",
    tag = "Machines",
    security(("bearerAuth" = [])),
    params(("machine_id" = i64, Path, description = "Machine id")),
    request_body = ReportErrorRequest,
    responses(
        (status = 201, description = "Error recorded; critical errors mark the machine broken", body = MachineErrorRecord),
        (status = 400, description = "Missing code or message", body = ErrorResponse),
        (status = 404, description = "Machine not found", body = ErrorResponse)
    )
)]
pub async fn report_error(
    State(state): State<AppState>,
    Path(machine_id): Path<i64>,
    headers: HeaderMap,
    Json(request): Json<ReportErrorRequest>,
) -> Result<(StatusCode, Json<MachineErrorRecord>), ApiError> {
    let user = state.current_user(&headers).await?;
    let record = state
        .services()
        .machines
        .report_error(&user, machine_id, &request)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[utoipa::path(
    post,
    path = "/api/machines/{machine_id}/start",
    tag = "Sessions",
    security(("bearerAuth" = [])),
    params(("machine_id" = i64, Path, description = "Machine id")),
    request_body(content = StartSessionRequest, description = "Optional duration override"),
    responses(
        (status = 201, description = "Cycle started, machine is running", body = LaundrySession),
        (status = 400, description = "Duration out of range", body = ErrorResponse),
        (status = 404, description = "Machine not found", body = ErrorResponse),
        (status = 409, description = "Machine is not free", body = ErrorResponse)
    )
)]
pub async fn start_session(
    State(state): State<AppState>,
    Path(machine_id): Path<i64>,
    headers: HeaderMap,
    body: Option<Json<StartSessionRequest>>,
) -> Result<(StatusCode, Json<LaundrySession>), ApiError> {
    let user = state.current_user(&headers).await?;
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let session = state
        .services()
        .sessions
        .start(&user, machine_id, &request)
        .await?;
    Ok((StatusCode::CREATED, Json(session)))
}
