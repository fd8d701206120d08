use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};
use cleancycle_database::{Reservation, ReservationStatus};
use cleancycle_laundry::{Availability, CreateReservationRequest};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{error::ErrorResponse, ApiError, AppState};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct StatusQuery {
    pub status: Option<ReservationStatus>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct UpcomingQuery {
    /// Look-ahead in hours, 24 when omitted.
    pub hours: Option<i64>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AvailabilityQuery {
    pub machine_id: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[utoipa::path(
    get,
    path = "/api/reservations",
    tag = "Reservations",
    security(("bearerAuth" = [])),
    params(StatusQuery),
    responses(
        (status = 200, description = "Own reservations by start time", body = [Reservation]),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    )
)]
pub async fn list_reservations(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Vec<Reservation>>, ApiError> {
    let user = state.current_user(&headers).await?;
    let reservations = state
        .services()
        .reservations
        .list_for_user(&user, query.status)
        .await?;
    Ok(Json(reservations))
}

#[utoipa::path(
    post,
    path = "/api/reservations",
    tag = "Reservations",
    security(("bearerAuth" = [])),
    request_body = CreateReservationRequest,
    responses(
        (status = 201, description = "Pending reservation created", body = Reservation),
        (status = 400, description = "Window is empty or in the past", body = ErrorResponse),
        (status = 404, description = "Machine not found", body = ErrorResponse),
        (status = 409, description = "Overlaps a confirmed reservation", body = ErrorResponse)
    )
)]
pub async fn create_reservation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<Reservation>), ApiError> {
    let user = state.current_user(&headers).await?;
    let reservation = state
        .services()
        .reservations
        .create(&user, &request)
        .await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

#[utoipa::path(
    get,
    path = "/api/reservations/upcoming",
    tag = "Reservations",
    security(("bearerAuth" = [])),
    params(UpcomingQuery),
    responses(
        (status = 200, description = "Confirmed reservations starting soon", body = [Reservation]),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    )
)]
pub async fn upcoming_reservations(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<UpcomingQuery>,
) -> Result<Json<Vec<Reservation>>, ApiError> {
    let user = state.current_user(&headers).await?;
    Ok(Json(
        state
            .services()
            .reservations
            .upcoming(&user, query.hours)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/reservations/availability",
    tag = "Reservations",
    security(("bearerAuth" = [])),
    params(AvailabilityQuery),
    responses(
        (status = 200, description = "Whether the window is free of confirmed reservations", body = Availability),
        (status = 400, description = "End is not after start", body = ErrorResponse)
    )
)]
pub async fn check_availability(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Availability>, ApiError> {
    state.current_user(&headers).await?;
    let availability = state
        .services()
        .reservations
        .availability(query.machine_id, query.start, query.end)
        .await?;
    Ok(Json(availability))
}

#[utoipa::path(
    post,
    path = "/api/reservations/{reservation_id}/cancel",
    tag = "Reservations",
    security(("bearerAuth" = [])),
    params(("reservation_id" = i64, Path, description = "Reservation id")),
    responses(
        (status = 200, description = "Reservation cancelled", body = Reservation),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Reservation not found", body = ErrorResponse),
        (status = 409, description = "Already cancelled or completed", body = ErrorResponse)
    )
)]
pub async fn cancel_reservation(
    State(state): State<AppState>,
    Path(reservation_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Reservation>, ApiError> {
    let user = state.current_user(&headers).await?;
    Ok(Json(
        state
            .services()
            .reservations
            .cancel(&user, reservation_id)
            .await?,
    ))
}
