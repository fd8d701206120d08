use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::SqlitePool;

use super::activity_repository::insert_log;
use crate::entities::{ErrorSeverity, LogAction, MachineErrorRecord, NewMachineError};
use crate::timestamp;
use crate::types::{DatabaseError, DatabaseResult};

pub struct MachineErrorRepository {
    pool: SqlitePool,
}

impl MachineErrorRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a fault and mirror it onto the machine row. A critical fault
    /// also takes the machine out of service.
    pub async fn report(
        &self,
        report: &NewMachineError,
        reporter_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> DatabaseResult<MachineErrorRecord> {
        let now_str = timestamp::format(now);
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE machines SET
                error_code = ?,
                error_message = ?,
                status = CASE WHEN ? THEN 'broken' ELSE status END,
                updated_at = ?
             WHERE id = ?",
        )
        .bind(&report.error_code)
        .bind(&report.error_message)
        .bind(report.severity == ErrorSeverity::Critical)
        .bind(&now_str)
        .bind(report.machine_id)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(DatabaseError::not_found("machine", report.machine_id));
        }

        let record = sqlx::query_as::<_, MachineErrorRecord>(
            "INSERT INTO machine_errors (machine_id, error_code, error_message, severity, resolved, created_at)
             VALUES (?, ?, ?, ?, 0, ?) RETURNING *",
        )
        .bind(report.machine_id)
        .bind(&report.error_code)
        .bind(&report.error_message)
        .bind(report.severity)
        .bind(&now_str)
        .fetch_one(&mut *tx)
        .await?;

        insert_log(
            &mut tx,
            Some(report.machine_id),
            reporter_id,
            LogAction::ErrorReported,
            json!({
                "error_id": record.id,
                "error_code": record.error_code,
                "severity": record.severity,
            }),
            now,
        )
        .await?;

        tx.commit().await?;
        Ok(record)
    }

    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<MachineErrorRecord>> {
        let record =
            sqlx::query_as::<_, MachineErrorRecord>("SELECT * FROM machine_errors WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(record)
    }

    pub async fn unresolved_for_machine(&self, machine_id: i64) -> DatabaseResult<Vec<MachineErrorRecord>> {
        let records = sqlx::query_as::<_, MachineErrorRecord>(
            "SELECT * FROM machine_errors WHERE machine_id = ? AND resolved = 0
             ORDER BY created_at DESC, id DESC",
        )
        .bind(machine_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    /// Mark a fault resolved. When it was the machine's last open fault the
    /// error columns on the machine are cleared; the status is left for staff
    /// to change. `None` when the fault was already resolved.
    pub async fn resolve(
        &self,
        id: i64,
        resolver_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> DatabaseResult<Option<MachineErrorRecord>> {
        let now_str = timestamp::format(now);
        let mut tx = self.pool.begin().await?;

        let record = sqlx::query_as::<_, MachineErrorRecord>(
            "UPDATE machine_errors SET resolved = 1, resolved_at = ?
             WHERE id = ? AND resolved = 0
             RETURNING *",
        )
        .bind(&now_str)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(record) = record else {
            return Ok(None);
        };

        sqlx::query(
            "UPDATE machines SET error_code = NULL, error_message = NULL, updated_at = ?
             WHERE id = ?
               AND NOT EXISTS (SELECT 1 FROM machine_errors WHERE machine_id = ? AND resolved = 0)",
        )
        .bind(&now_str)
        .bind(record.machine_id)
        .bind(record.machine_id)
        .execute(&mut *tx)
        .await?;

        insert_log(
            &mut tx,
            Some(record.machine_id),
            resolver_id,
            LogAction::ErrorResolved,
            json!({ "error_id": record.id, "error_code": record.error_code }),
            now,
        )
        .await?;

        tx.commit().await?;
        Ok(Some(record))
    }
}
