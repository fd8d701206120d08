//! Booking machines ahead of time.

use chrono::{DateTime, Duration, Utc};
use cleancycle_database::{
    ActivityRepository, ActivityType, DatabaseError, MachineRepository, NewActivity,
    NewReservation, Page, Reservation, ReservationRepository, ReservationStatus, User,
};
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::schedule::TimeRange;
use crate::types::{Availability, CreateReservationRequest, LaundryError, LaundryResult};
use crate::utils::PermissionChecker;

pub const DEFAULT_UPCOMING_HOURS: i64 = 24;
const MAX_UPCOMING_HOURS: i64 = 24 * 14;

pub struct ReservationService {
    reservations: ReservationRepository,
    machines: MachineRepository,
    activity: ActivityRepository,
}

impl ReservationService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            reservations: ReservationRepository::new(pool.clone()),
            machines: MachineRepository::new(pool.clone()),
            activity: ActivityRepository::new(pool),
        }
    }

    /// Book a future slot. The overlap check and the insert are one statement.
    pub async fn create(
        &self,
        user: &User,
        request: &CreateReservationRequest,
    ) -> LaundryResult<Reservation> {
        let range = TimeRange::new(request.start_time, request.end_time)?;
        let now = Utc::now();
        if range.start() <= now {
            return Err(LaundryError::validation("reservations must start in the future"));
        }

        if self.machines.find_by_id(request.machine_id).await?.is_none() {
            return Err(LaundryError::not_found("machine", request.machine_id));
        }

        let notes = request
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|notes| !notes.is_empty())
            .map(str::to_string);

        let reservation = self
            .reservations
            .create(
                &NewReservation {
                    user_id: user.id,
                    machine_id: request.machine_id,
                    start_time: range.start(),
                    end_time: range.end(),
                    notes,
                },
                now,
            )
            .await
            .map_err(|err| match err {
                DatabaseError::Conflict(_) => LaundryError::ReservationConflict,
                other => other.into(),
            })?;

        self.record(
            user,
            &reservation,
            ActivityType::ReservationCreated,
            "Created reservation",
        )
        .await;
        info!(reservation_id = reservation.id, machine_id = reservation.machine_id, "reservation created");
        Ok(reservation)
    }

    pub async fn list_for_user(
        &self,
        user: &User,
        status: Option<ReservationStatus>,
    ) -> LaundryResult<Vec<Reservation>> {
        Ok(self.reservations.list_for_user(user.id, status).await?)
    }

    pub async fn list_all(
        &self,
        actor: &User,
        status: Option<ReservationStatus>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> LaundryResult<Vec<Reservation>> {
        PermissionChecker::require_staff(actor)?;
        Ok(self
            .reservations
            .list_all(status, Page::new(limit, offset))
            .await?)
    }

    /// Confirmed reservations starting within the next `hours`.
    pub async fn upcoming(&self, user: &User, hours: Option<i64>) -> LaundryResult<Vec<Reservation>> {
        let hours = hours
            .unwrap_or(DEFAULT_UPCOMING_HOURS)
            .clamp(1, MAX_UPCOMING_HOURS);
        let now = Utc::now();
        Ok(self
            .reservations
            .upcoming_for_user(user.id, now, now + Duration::hours(hours))
            .await?)
    }

    pub async fn availability(
        &self,
        machine_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> LaundryResult<Availability> {
        let range = TimeRange::new(start, end)?;
        let available = self
            .reservations
            .is_machine_available(machine_id, range.start(), range.end())
            .await?;
        Ok(Availability { available })
    }

    /// The calendar for one machine: confirmed bookings inside the window.
    pub async fn machine_schedule(
        &self,
        machine_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> LaundryResult<Vec<Reservation>> {
        let range = TimeRange::new(start, end)?;
        if self.machines.find_by_id(machine_id).await?.is_none() {
            return Err(LaundryError::not_found("machine", machine_id));
        }
        Ok(self
            .reservations
            .for_machine_in_window(machine_id, range.start(), range.end())
            .await?)
    }

    /// Owners cancel their own reservations; staff may cancel any.
    pub async fn cancel(&self, user: &User, reservation_id: i64) -> LaundryResult<Reservation> {
        let current = self.find(reservation_id).await?;
        PermissionChecker::require_owner_or_staff(user, current.user_id)?;

        let reservation = self
            .reservations
            .cancel(reservation_id, Utc::now())
            .await?
            .ok_or(LaundryError::InvalidTransition {
                from: current.status,
                to: ReservationStatus::Cancelled,
            })?;

        self.record(
            user,
            &reservation,
            ActivityType::ReservationCancelled,
            "Cancelled reservation",
        )
        .await;
        Ok(reservation)
    }

    /// Fails with a conflict when a confirmed reservation already holds the slot.
    pub async fn confirm(&self, actor: &User, reservation_id: i64) -> LaundryResult<Reservation> {
        PermissionChecker::require_staff(actor)?;
        let current = self.find(reservation_id).await?;
        if current.status != ReservationStatus::Pending {
            return Err(LaundryError::InvalidTransition {
                from: current.status,
                to: ReservationStatus::Confirmed,
            });
        }

        let reservation = self
            .reservations
            .confirm(reservation_id, Utc::now())
            .await?
            .ok_or(LaundryError::ReservationConflict)?;

        self.record(
            actor,
            &reservation,
            ActivityType::ReservationConfirmed,
            "Confirmed reservation",
        )
        .await;
        Ok(reservation)
    }

    pub async fn complete(&self, actor: &User, reservation_id: i64) -> LaundryResult<Reservation> {
        PermissionChecker::require_staff(actor)?;
        let current = self.find(reservation_id).await?;

        let reservation = self
            .reservations
            .complete(reservation_id, Utc::now())
            .await?
            .ok_or(LaundryError::InvalidTransition {
                from: current.status,
                to: ReservationStatus::Completed,
            })?;

        self.record(
            actor,
            &reservation,
            ActivityType::ReservationCompleted,
            "Completed reservation",
        )
        .await;
        Ok(reservation)
    }

    async fn find(&self, reservation_id: i64) -> LaundryResult<Reservation> {
        self.reservations
            .find_by_id(reservation_id)
            .await?
            .ok_or_else(|| LaundryError::not_found("reservation", reservation_id))
    }

    async fn record(
        &self,
        actor: &User,
        reservation: &Reservation,
        action_type: ActivityType,
        action: &str,
    ) {
        let activity = NewActivity::new(action_type, action)
            .user(actor.id)
            .machine(reservation.machine_id)
            .details(json!({
                "reservation_id": reservation.id,
                "owner_id": reservation.user_id,
                "start_time": reservation.start_time,
                "end_time": reservation.end_time,
            }));
        if let Err(err) = self.activity.record(&activity, Utc::now()).await {
            warn!(reservation_id = reservation.id, error = %err, "failed to record reservation activity");
        }
    }
}
