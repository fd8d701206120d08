//! Laundry session repository. Starting and closing a session are the
//! contended transitions: both are conditional updates inside one
//! transaction, backed by the one-active-session-per-machine index.

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use sqlx::SqlitePool;

use super::activity_repository::{insert_activity, insert_log};
use super::notification_repository::insert_notification;
use crate::entities::{
    ActivityType, LaundrySession, LogAction, Machine, NewActivity, NotificationType,
    SessionOutcome,
};
use crate::timestamp;
use crate::types::{DatabaseError, DatabaseResult, Page};

pub struct LaundrySessionRepository {
    pool: SqlitePool,
}

/// A session closed by [`LaundrySessionRepository::close`].
#[derive(Debug, Clone)]
pub struct ClosedSession {
    pub session: LaundrySession,
    /// Id of the `expired` notification written for a swept session.
    pub notification_id: Option<i64>,
}

impl LaundrySessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Claim a free (or booked) machine and open an active session on it.
    ///
    /// Fails with [`DatabaseError::Conflict`] when the machine is busy and
    /// [`DatabaseError::NotFound`] when it does not exist.
    pub async fn start(
        &self,
        user_id: i64,
        machine_id: i64,
        duration_minutes: i64,
        now: DateTime<Utc>,
    ) -> DatabaseResult<LaundrySession> {
        let now_str = timestamp::format(now);
        let end_time = now + Duration::minutes(duration_minutes);
        let end_str = timestamp::format(end_time);

        let mut tx = self.pool.begin().await?;

        let claimed = sqlx::query_as::<_, Machine>(
            "UPDATE machines SET status = 'running', updated_at = ?
             WHERE id = ? AND status IN ('free', 'booked')
             RETURNING *",
        )
        .bind(&now_str)
        .bind(machine_id)
        .fetch_optional(&mut *tx)
        .await?;

        if claimed.is_none() {
            let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM machines WHERE id = ?")
                .bind(machine_id)
                .fetch_optional(&mut *tx)
                .await?;
            return Err(match exists {
                Some(_) => DatabaseError::Conflict(format!("machine {machine_id} is not free")),
                None => DatabaseError::not_found("machine", machine_id),
            });
        }

        let session = sqlx::query_as::<_, LaundrySession>(
            "INSERT INTO sessions (user_id, machine_id, start_time, end_time, status, created_at)
             VALUES (?, ?, ?, ?, 'active', ?) RETURNING *",
        )
        .bind(user_id)
        .bind(machine_id)
        .bind(&now_str)
        .bind(&end_str)
        .bind(&now_str)
        .fetch_one(&mut *tx)
        .await
        .map_err(|err| match DatabaseError::from(err) {
            DatabaseError::Duplicate(_) => {
                DatabaseError::Conflict(format!("machine {machine_id} already has an active session"))
            }
            other => other,
        })?;

        insert_log(
            &mut tx,
            Some(machine_id),
            Some(user_id),
            LogAction::MachineStarted,
            json!({
                "session_id": session.id,
                "duration": duration_minutes,
                "end_time": end_str,
            }),
            now,
        )
        .await?;

        insert_activity(
            &mut tx,
            &NewActivity::new(ActivityType::SessionStart, "Started laundry session")
                .user(user_id)
                .machine(machine_id)
                .session(session.id)
                .details(json!({ "duration_minutes": duration_minutes })),
            now,
        )
        .await?;

        tx.commit().await?;
        Ok(session)
    }

    /// Close an active session and free its machine.
    ///
    /// Returns `None` when the session was no longer active, so a sweep and
    /// a manual finish racing on the same row close it exactly once.
    pub async fn close(
        &self,
        session_id: i64,
        outcome: &SessionOutcome,
        now: DateTime<Utc>,
    ) -> DatabaseResult<Option<ClosedSession>> {
        let now_str = timestamp::format(now);
        let mut tx = self.pool.begin().await?;

        let session = sqlx::query_as::<_, LaundrySession>(
            "UPDATE sessions SET status = ?, actual_end = ?
             WHERE id = ? AND status = 'active'
             RETURNING *",
        )
        .bind(outcome.status())
        .bind(&now_str)
        .bind(session_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(session) = session else {
            return Ok(None);
        };

        sqlx::query(
            "UPDATE machines SET status = 'free', updated_at = ?
             WHERE id = ? AND status = 'running'",
        )
        .bind(&now_str)
        .bind(session.machine_id)
        .execute(&mut *tx)
        .await?;

        let action = match outcome {
            SessionOutcome::Finished { .. } => LogAction::SessionFinished,
            SessionOutcome::Cancelled { .. } => LogAction::SessionCancelled,
            SessionOutcome::Expired { .. } => LogAction::SessionExpired,
            SessionOutcome::Overridden { .. } => LogAction::ManualOverride,
        };
        insert_log(
            &mut tx,
            Some(session.machine_id),
            outcome.actor_id().or(Some(session.user_id)),
            action,
            json!({ "session_id": session.id, "end_time": now_str }),
            now,
        )
        .await?;

        let mut notification_id = None;
        match outcome {
            SessionOutcome::Expired { notice } => {
                let notification = insert_notification(
                    &mut tx,
                    session.user_id,
                    NotificationType::Expired,
                    notice,
                    now,
                )
                .await?;
                notification_id = Some(notification.id);
            }
            _ => {
                insert_activity(
                    &mut tx,
                    &NewActivity::new(ActivityType::SessionEnd, "Ended laundry session")
                        .user(session.user_id)
                        .machine(session.machine_id)
                        .session(session.id)
                        .details(json!({
                            "status": session.status,
                            "duration_minutes": session.duration_minutes(),
                            "closed_by": outcome.actor_id(),
                        })),
                    now,
                )
                .await?;
            }
        }

        tx.commit().await?;
        Ok(Some(ClosedSession {
            session,
            notification_id,
        }))
    }

    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<LaundrySession>> {
        let session = sqlx::query_as::<_, LaundrySession>("SELECT * FROM sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(session)
    }

    pub async fn active_for_user(&self, user_id: i64) -> DatabaseResult<Vec<LaundrySession>> {
        let sessions = sqlx::query_as::<_, LaundrySession>(
            "SELECT * FROM sessions WHERE user_id = ? AND status = 'active' ORDER BY end_time",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(sessions)
    }

    pub async fn active_for_machine(&self, machine_id: i64) -> DatabaseResult<Option<LaundrySession>> {
        let session = sqlx::query_as::<_, LaundrySession>(
            "SELECT * FROM sessions WHERE machine_id = ? AND status = 'active'",
        )
        .bind(machine_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    pub async fn history_for_user(&self, user_id: i64, page: Page) -> DatabaseResult<Vec<LaundrySession>> {
        let sessions = sqlx::query_as::<_, LaundrySession>(
            "SELECT * FROM sessions WHERE user_id = ?
             ORDER BY start_time DESC, id DESC LIMIT ? OFFSET ?",
        )
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(sessions)
    }

    /// Active sessions whose end time is not after `now`.
    pub async fn expired(&self, now: DateTime<Utc>) -> DatabaseResult<Vec<LaundrySession>> {
        let sessions = sqlx::query_as::<_, LaundrySession>(
            "SELECT * FROM sessions WHERE status = 'active' AND end_time <= ? ORDER BY end_time",
        )
        .bind(timestamp::format(now))
        .fetch_all(&self.pool)
        .await?;
        Ok(sessions)
    }

    /// Finished sessions of a user, optionally only those started at or after `since`.
    pub async fn finished_for_user(
        &self,
        user_id: i64,
        since: Option<DateTime<Utc>>,
    ) -> DatabaseResult<Vec<LaundrySession>> {
        let sessions = sqlx::query_as::<_, LaundrySession>(
            "SELECT * FROM sessions
             WHERE user_id = ? AND status = 'finished' AND (? IS NULL OR start_time >= ?)
             ORDER BY start_time",
        )
        .bind(user_id)
        .bind(timestamp::format_opt(since))
        .bind(timestamp::format_opt(since))
        .fetch_all(&self.pool)
        .await?;
        Ok(sessions)
    }

    pub async fn finished_for_machine(
        &self,
        machine_id: i64,
        since: Option<DateTime<Utc>>,
    ) -> DatabaseResult<Vec<LaundrySession>> {
        let sessions = sqlx::query_as::<_, LaundrySession>(
            "SELECT * FROM sessions
             WHERE machine_id = ? AND status = 'finished' AND (? IS NULL OR start_time >= ?)
             ORDER BY start_time",
        )
        .bind(machine_id)
        .bind(timestamp::format_opt(since))
        .bind(timestamp::format_opt(since))
        .fetch_all(&self.pool)
        .await?;
        Ok(sessions)
    }

    pub async fn count_active(&self) -> DatabaseResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sessions WHERE status = 'active'")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
