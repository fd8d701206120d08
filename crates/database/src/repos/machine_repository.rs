//! Machine repository for database operations.

use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::SqlitePool;

use super::activity_repository::insert_log;
use crate::entities::{
    LaundrySession, LogAction, Machine, MachineStatus, MachineType, NewMachine, StatusCount,
};
use crate::timestamp;
use crate::types::{DatabaseError, DatabaseResult};

pub struct MachineRepository {
    pool: SqlitePool,
}

/// Result of a staff status override.
#[derive(Debug, Clone)]
pub struct StatusOverride {
    pub machine: Machine,
    pub previous: MachineStatus,
    /// Active sessions closed because the machine was forced to `free`.
    pub closed_sessions: Vec<LaundrySession>,
}

impl MachineRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, machine: &NewMachine, now: DateTime<Utc>) -> DatabaseResult<Machine> {
        let name = machine.name.trim();
        if name.is_empty() {
            return Err(DatabaseError::ValidationError("machine name is required".to_string()));
        }
        let duration = machine
            .default_duration
            .unwrap_or(NewMachine::DEFAULT_DURATION_MINUTES);
        if duration <= 0 {
            return Err(DatabaseError::ValidationError(
                "default duration must be positive".to_string(),
            ));
        }

        let now = timestamp::format(now);
        let created = sqlx::query_as::<_, Machine>(
            "INSERT INTO machines (room_id, name, type, status, default_duration, capacity_kg, created_at, updated_at)
             VALUES (?, ?, ?, 'free', ?, ?, ?, ?) RETURNING *",
        )
        .bind(machine.room_id)
        .bind(name)
        .bind(machine.machine_type)
        .bind(duration)
        .bind(machine.capacity_kg)
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<Machine>> {
        let machine = sqlx::query_as::<_, Machine>("SELECT * FROM machines WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(machine)
    }

    pub async fn list_all(&self) -> DatabaseResult<Vec<Machine>> {
        let machines = sqlx::query_as::<_, Machine>("SELECT * FROM machines ORDER BY room_id, name")
            .fetch_all(&self.pool)
            .await?;
        Ok(machines)
    }

    pub async fn list_by_room(&self, room_id: i64) -> DatabaseResult<Vec<Machine>> {
        let machines = sqlx::query_as::<_, Machine>(
            "SELECT * FROM machines WHERE room_id = ? ORDER BY type, name",
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(machines)
    }

    /// Free machines in a room with no confirmed reservation overlapping the window.
    pub async fn available_for_slot(
        &self,
        room_id: i64,
        machine_type: Option<MachineType>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DatabaseResult<Vec<Machine>> {
        let machines = sqlx::query_as::<_, Machine>(
            "SELECT m.* FROM machines m
             WHERE m.room_id = ?
               AND m.status = 'free'
               AND (? IS NULL OR m.type = ?)
               AND NOT EXISTS (
                   SELECT 1 FROM reservations r
                   WHERE r.machine_id = m.id
                     AND r.status = 'confirmed'
                     AND r.start_time < ?
                     AND r.end_time > ?
               )
             ORDER BY m.type, m.name",
        )
        .bind(room_id)
        .bind(machine_type)
        .bind(machine_type)
        .bind(timestamp::format(end))
        .bind(timestamp::format(start))
        .fetch_all(&self.pool)
        .await?;
        Ok(machines)
    }

    /// Machine counts grouped by status, optionally limited to one room.
    pub async fn status_counts(&self, room_id: Option<i64>) -> DatabaseResult<Vec<StatusCount>> {
        let counts = sqlx::query_as::<_, StatusCount>(
            "SELECT status, COUNT(*) AS count FROM machines
             WHERE (? IS NULL OR room_id = ?)
             GROUP BY status",
        )
        .bind(room_id)
        .bind(room_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(counts)
    }

    /// Force a machine into `status`. Forcing `free` finishes every active
    /// session on the machine in the same transaction.
    pub async fn override_status(
        &self,
        machine_id: i64,
        status: MachineStatus,
        actor_id: i64,
        now: DateTime<Utc>,
    ) -> DatabaseResult<StatusOverride> {
        let now_str = timestamp::format(now);
        let mut tx = self.pool.begin().await?;

        let previous: Option<(MachineStatus,)> =
            sqlx::query_as("SELECT status FROM machines WHERE id = ?")
                .bind(machine_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((previous,)) = previous else {
            return Err(DatabaseError::not_found("machine", machine_id));
        };

        let closed_sessions = if status == MachineStatus::Free {
            sqlx::query_as::<_, LaundrySession>(
                "UPDATE sessions SET status = 'finished', actual_end = ?
                 WHERE machine_id = ? AND status = 'active'
                 RETURNING *",
            )
            .bind(&now_str)
            .bind(machine_id)
            .fetch_all(&mut *tx)
            .await?
        } else {
            Vec::new()
        };

        let machine = sqlx::query_as::<_, Machine>(
            "UPDATE machines SET status = ?, updated_at = ? WHERE id = ? RETURNING *",
        )
        .bind(status)
        .bind(&now_str)
        .bind(machine_id)
        .fetch_one(&mut *tx)
        .await?;

        insert_log(
            &mut tx,
            Some(machine_id),
            Some(actor_id),
            LogAction::StatusChanged,
            json!({ "from": previous, "to": status }),
            now,
        )
        .await?;

        for session in &closed_sessions {
            insert_log(
                &mut tx,
                Some(machine_id),
                Some(actor_id),
                LogAction::ManualOverride,
                json!({ "session_id": session.id, "user_id": session.user_id, "end_time": now_str }),
                now,
            )
            .await?;
        }

        tx.commit().await?;
        Ok(StatusOverride {
            machine,
            previous,
            closed_sessions,
        })
    }
}
