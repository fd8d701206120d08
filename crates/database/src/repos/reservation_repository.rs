//! Reservation repository. The overlap rule is embedded in the insert and
//! confirm statements so check and write happen atomically.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::entities::{NewReservation, Reservation, ReservationStatus};
use crate::timestamp;
use crate::types::{DatabaseError, DatabaseResult, Page};

pub struct ReservationRepository {
    pool: SqlitePool,
}

impl ReservationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a `pending` reservation unless a confirmed one on the same
    /// machine overlaps the window.
    pub async fn create(&self, reservation: &NewReservation, now: DateTime<Utc>) -> DatabaseResult<Reservation> {
        if reservation.end_time <= reservation.start_time {
            return Err(DatabaseError::ValidationError(
                "reservation must end after it starts".to_string(),
            ));
        }

        let now = timestamp::format(now);
        let start = timestamp::format(reservation.start_time);
        let end = timestamp::format(reservation.end_time);

        let created = sqlx::query_as::<_, Reservation>(
            "INSERT INTO reservations (user_id, machine_id, start_time, end_time, status, notes, created_at, updated_at)
             SELECT ?, ?, ?, ?, 'pending', ?, ?, ?
             WHERE NOT EXISTS (
                 SELECT 1 FROM reservations
                 WHERE machine_id = ?
                   AND status = 'confirmed'
                   AND start_time < ?
                   AND end_time > ?
             )
             RETURNING *",
        )
        .bind(reservation.user_id)
        .bind(reservation.machine_id)
        .bind(&start)
        .bind(&end)
        .bind(&reservation.notes)
        .bind(&now)
        .bind(&now)
        .bind(reservation.machine_id)
        .bind(&end)
        .bind(&start)
        .fetch_optional(&self.pool)
        .await?;

        created.ok_or_else(|| {
            DatabaseError::Conflict(format!(
                "machine {} already has a confirmed reservation in that window",
                reservation.machine_id
            ))
        })
    }

    /// True iff no confirmed reservation on the machine overlaps `[start, end)`.
    pub async fn is_machine_available(
        &self,
        machine_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DatabaseResult<bool> {
        let (conflicts,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM reservations
             WHERE machine_id = ? AND status = 'confirmed' AND start_time < ? AND end_time > ?",
        )
        .bind(machine_id)
        .bind(timestamp::format(end))
        .bind(timestamp::format(start))
        .fetch_one(&self.pool)
        .await?;
        Ok(conflicts == 0)
    }

    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<Reservation>> {
        let reservation = sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(reservation)
    }

    pub async fn list_for_user(
        &self,
        user_id: i64,
        status: Option<ReservationStatus>,
    ) -> DatabaseResult<Vec<Reservation>> {
        let reservations = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations
             WHERE user_id = ? AND (? IS NULL OR status = ?)
             ORDER BY start_time",
        )
        .bind(user_id)
        .bind(status)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(reservations)
    }

    pub async fn list_all(
        &self,
        status: Option<ReservationStatus>,
        page: Page,
    ) -> DatabaseResult<Vec<Reservation>> {
        let reservations = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations
             WHERE (? IS NULL OR status = ?)
             ORDER BY start_time DESC, id DESC LIMIT ? OFFSET ?",
        )
        .bind(status)
        .bind(status)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(reservations)
    }

    /// Confirmed reservations of the user starting within `[from, until]`.
    pub async fn upcoming_for_user(
        &self,
        user_id: i64,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> DatabaseResult<Vec<Reservation>> {
        let reservations = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations
             WHERE user_id = ? AND status = 'confirmed' AND start_time >= ? AND start_time <= ?
             ORDER BY start_time",
        )
        .bind(user_id)
        .bind(timestamp::format(from))
        .bind(timestamp::format(until))
        .fetch_all(&self.pool)
        .await?;
        Ok(reservations)
    }

    /// Confirmed reservations on the machine that lie entirely inside
    /// `[from, until]`, earliest first.
    pub async fn for_machine_in_window(
        &self,
        machine_id: i64,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> DatabaseResult<Vec<Reservation>> {
        let reservations = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations
             WHERE machine_id = ? AND status = 'confirmed' AND start_time >= ? AND end_time <= ?
             ORDER BY start_time",
        )
        .bind(machine_id)
        .bind(timestamp::format(from))
        .bind(timestamp::format(until))
        .fetch_all(&self.pool)
        .await?;
        Ok(reservations)
    }

    /// `pending -> confirmed`, refused if another confirmed reservation overlaps.
    /// `None` means the row was not pending or the window is taken.
    pub async fn confirm(&self, id: i64, now: DateTime<Utc>) -> DatabaseResult<Option<Reservation>> {
        let reservation = sqlx::query_as::<_, Reservation>(
            "UPDATE reservations SET status = 'confirmed', updated_at = ?
             WHERE id = ?
               AND status = 'pending'
               AND NOT EXISTS (
                   SELECT 1 FROM reservations other
                   WHERE other.machine_id = reservations.machine_id
                     AND other.id != reservations.id
                     AND other.status = 'confirmed'
                     AND other.start_time < reservations.end_time
                     AND other.end_time > reservations.start_time
               )
             RETURNING *",
        )
        .bind(timestamp::format(now))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(reservation)
    }

    /// `pending|confirmed -> cancelled`.
    pub async fn cancel(&self, id: i64, now: DateTime<Utc>) -> DatabaseResult<Option<Reservation>> {
        self.transition(id, &["pending", "confirmed"], ReservationStatus::Cancelled, now)
            .await
    }

    /// `confirmed -> completed`.
    pub async fn complete(&self, id: i64, now: DateTime<Utc>) -> DatabaseResult<Option<Reservation>> {
        self.transition(id, &["confirmed"], ReservationStatus::Completed, now)
            .await
    }

    async fn transition(
        &self,
        id: i64,
        from: &[&str],
        to: ReservationStatus,
        now: DateTime<Utc>,
    ) -> DatabaseResult<Option<Reservation>> {
        let placeholders = vec!["?"; from.len()].join(", ");
        let sql = format!(
            "UPDATE reservations SET status = ?, updated_at = ?
             WHERE id = ? AND status IN ({placeholders})
             RETURNING *"
        );

        let mut query = sqlx::query_as::<_, Reservation>(&sql)
            .bind(to)
            .bind(timestamp::format(now))
            .bind(id);
        for status in from {
            query = query.bind(*status);
        }

        Ok(query.fetch_optional(&self.pool).await?)
    }

    /// Confirmed, not yet reminded reservations starting in `(now, horizon]`.
    pub async fn unreminded_starting_before(
        &self,
        now: DateTime<Utc>,
        horizon: DateTime<Utc>,
    ) -> DatabaseResult<Vec<Reservation>> {
        let reservations = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations
             WHERE status = 'confirmed' AND reminded_at IS NULL
               AND start_time > ? AND start_time <= ?
             ORDER BY start_time",
        )
        .bind(timestamp::format(now))
        .bind(timestamp::format(horizon))
        .fetch_all(&self.pool)
        .await?;
        Ok(reservations)
    }

    /// Stamp `reminded_at` once; `false` if another sweep got there first.
    pub async fn mark_reminded(&self, id: i64, now: DateTime<Utc>) -> DatabaseResult<bool> {
        let result = sqlx::query(
            "UPDATE reservations SET reminded_at = ?, updated_at = ?
             WHERE id = ? AND reminded_at IS NULL",
        )
        .bind(timestamp::format(now))
        .bind(timestamp::format(now))
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Move every confirmed reservation whose window has passed to `completed`.
    pub async fn complete_elapsed(&self, now: DateTime<Utc>) -> DatabaseResult<Vec<Reservation>> {
        let now = timestamp::format(now);
        let completed = sqlx::query_as::<_, Reservation>(
            "UPDATE reservations SET status = 'completed', updated_at = ?
             WHERE status = 'confirmed' AND end_time <= ?
             RETURNING *",
        )
        .bind(&now)
        .bind(&now)
        .fetch_all(&self.pool)
        .await?;
        Ok(completed)
    }
}
