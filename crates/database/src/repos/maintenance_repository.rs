use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::SqlitePool;

use super::activity_repository::insert_log;
use crate::entities::{LogAction, MaintenanceRecord, NewMaintenance};
use crate::timestamp;
use crate::types::{DatabaseError, DatabaseResult, Page};

pub struct MaintenanceRepository {
    pool: SqlitePool,
}

impl MaintenanceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a maintenance window. The machine must not be running a cycle.
    pub async fn start(
        &self,
        maintenance: &NewMaintenance,
        now: DateTime<Utc>,
    ) -> DatabaseResult<MaintenanceRecord> {
        let now_str = timestamp::format(now);
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE machines SET status = 'maintenance', updated_at = ?
             WHERE id = ? AND status != 'running'",
        )
        .bind(&now_str)
        .bind(maintenance.machine_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM machines WHERE id = ?")
                .bind(maintenance.machine_id)
                .fetch_optional(&mut *tx)
                .await?;
            return Err(match exists {
                Some(_) => DatabaseError::Conflict(format!(
                    "machine {} is running a cycle",
                    maintenance.machine_id
                )),
                None => DatabaseError::not_found("machine", maintenance.machine_id),
            });
        }

        let record = sqlx::query_as::<_, MaintenanceRecord>(
            "INSERT INTO maintenance_history (machine_id, maintenance_type, description, performed_by, start_time, notes, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(maintenance.machine_id)
        .bind(maintenance.maintenance_type)
        .bind(&maintenance.description)
        .bind(maintenance.performed_by)
        .bind(&now_str)
        .bind(&maintenance.notes)
        .bind(&now_str)
        .fetch_one(&mut *tx)
        .await?;

        insert_log(
            &mut tx,
            Some(record.machine_id),
            record.performed_by,
            LogAction::MaintenanceStarted,
            json!({ "maintenance_id": record.id, "type": record.maintenance_type }),
            now,
        )
        .await?;

        tx.commit().await?;
        Ok(record)
    }

    /// Close an open window, return the machine to `free` and stamp
    /// `last_maintenance`. `None` when the window was already closed.
    pub async fn complete(
        &self,
        id: i64,
        notes: Option<&str>,
        actor_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> DatabaseResult<Option<MaintenanceRecord>> {
        let now_str = timestamp::format(now);
        let mut tx = self.pool.begin().await?;

        let record = sqlx::query_as::<_, MaintenanceRecord>(
            "UPDATE maintenance_history SET end_time = ?, notes = COALESCE(?, notes)
             WHERE id = ? AND end_time IS NULL
             RETURNING *",
        )
        .bind(&now_str)
        .bind(notes)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(record) = record else {
            return Ok(None);
        };

        sqlx::query(
            "UPDATE machines SET status = 'free', last_maintenance = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&now_str)
        .bind(&now_str)
        .bind(record.machine_id)
        .execute(&mut *tx)
        .await?;

        insert_log(
            &mut tx,
            Some(record.machine_id),
            actor_id,
            LogAction::MaintenanceCompleted,
            json!({ "maintenance_id": record.id }),
            now,
        )
        .await?;

        tx.commit().await?;
        Ok(Some(record))
    }

    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<MaintenanceRecord>> {
        let record = sqlx::query_as::<_, MaintenanceRecord>(
            "SELECT * FROM maintenance_history WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    /// Latest first.
    pub async fn history(&self, machine_id: i64, page: Page) -> DatabaseResult<Vec<MaintenanceRecord>> {
        let records = sqlx::query_as::<_, MaintenanceRecord>(
            "SELECT * FROM maintenance_history WHERE machine_id = ?
             ORDER BY start_time DESC, id DESC LIMIT ? OFFSET ?",
        )
        .bind(machine_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }
}
