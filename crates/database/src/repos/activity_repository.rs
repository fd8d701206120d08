//! Activity and operational log repository.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::entities::{ActivityFilter, ActivityLog, LogAction, NewActivity, OperationLog};
use crate::timestamp;
use crate::types::{DatabaseResult, Page};

pub struct ActivityRepository {
    pool: SqlitePool,
}

impl ActivityRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn record(&self, activity: &NewActivity, now: DateTime<Utc>) -> DatabaseResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert_activity(&mut conn, activity, now).await
    }

    pub async fn list_for_user(&self, user_id: i64, page: Page) -> DatabaseResult<Vec<ActivityLog>> {
        let rows = sqlx::query_as::<_, ActivityLog>(
            "SELECT * FROM activity_logs WHERE user_id = ?
             ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
        )
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn list(&self, filter: &ActivityFilter, page: Page) -> DatabaseResult<Vec<ActivityLog>> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM activity_logs WHERE 1 = 1");

        if let Some(user_id) = filter.user_id {
            query.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(machine_id) = filter.machine_id {
            query.push(" AND machine_id = ").push_bind(machine_id);
        }
        if let Some(action_type) = filter.action_type {
            query.push(" AND action_type = ").push_bind(action_type);
        }
        if let Some(since) = filter.since {
            query
                .push(" AND created_at >= ")
                .push_bind(timestamp::format(since));
        }

        query
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);

        let rows = query
            .build_query_as::<ActivityLog>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn log(
        &self,
        machine_id: Option<i64>,
        user_id: Option<i64>,
        action: LogAction,
        details: Value,
        now: DateTime<Utc>,
    ) -> DatabaseResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert_log(&mut conn, machine_id, user_id, action, details, now).await
    }

    pub async fn list_logs(&self, page: Page) -> DatabaseResult<Vec<OperationLog>> {
        let rows = sqlx::query_as::<_, OperationLog>(
            "SELECT * FROM logs ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
        )
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

/// Insert an activity row on an existing connection or transaction.
pub(crate) async fn insert_activity(
    conn: &mut SqliteConnection,
    activity: &NewActivity,
    now: DateTime<Utc>,
) -> DatabaseResult<()> {
    let details = activity
        .details
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    sqlx::query(
        "INSERT INTO activity_logs (user_id, machine_id, session_id, action, action_type, details, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(activity.user_id)
    .bind(activity.machine_id)
    .bind(activity.session_id)
    .bind(&activity.action)
    .bind(activity.action_type)
    .bind(details)
    .bind(timestamp::format(now))
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Insert an operational log row on an existing connection or transaction.
pub(crate) async fn insert_log(
    conn: &mut SqliteConnection,
    machine_id: Option<i64>,
    user_id: Option<i64>,
    action: LogAction,
    details: Value,
    now: DateTime<Utc>,
) -> DatabaseResult<()> {
    sqlx::query(
        "INSERT INTO logs (machine_id, user_id, action, details, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(machine_id)
    .bind(user_id)
    .bind(action)
    .bind(serde_json::to_string(&details)?)
    .bind(timestamp::format(now))
    .execute(&mut *conn)
    .await?;
    Ok(())
}
