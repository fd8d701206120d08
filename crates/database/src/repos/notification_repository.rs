//! Notification repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use crate::entities::{
    DeliveryStatus, Notification, NotificationChannel, NotificationLog, NotificationType,
};
use crate::timestamp;
use crate::types::{DatabaseResult, Page};

/// Repository for notification database operations
pub struct NotificationRepository {
    pool: SqlitePool,
}

impl NotificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        user_id: i64,
        kind: NotificationType,
        message: &str,
        now: DateTime<Utc>,
    ) -> DatabaseResult<Notification> {
        let mut conn = self.pool.acquire().await?;
        insert_notification(&mut conn, user_id, kind, message, now).await
    }

    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<Notification>> {
        let notification =
            sqlx::query_as::<_, Notification>("SELECT * FROM notifications WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(notification)
    }

    /// Latest notifications first.
    pub async fn list_for_user(&self, user_id: i64, page: Page) -> DatabaseResult<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE user_id = ?
             ORDER BY sent_at DESC, id DESC LIMIT ? OFFSET ?",
        )
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(notifications)
    }

    /// Notifications without a read timestamp.
    pub async fn unread_count(&self, user_id: i64) -> DatabaseResult<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND read_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Mark one of the user's notifications read. Re-reading keeps the first
    /// timestamp. `None` when the notification does not belong to the user.
    pub async fn mark_read(
        &self,
        id: i64,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> DatabaseResult<Option<Notification>> {
        let notification = sqlx::query_as::<_, Notification>(
            "UPDATE notifications SET read_at = COALESCE(read_at, ?)
             WHERE id = ? AND user_id = ?
             RETURNING *",
        )
        .bind(timestamp::format(now))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(notification)
    }

    pub async fn mark_all_read(&self, user_id: i64, now: DateTime<Utc>) -> DatabaseResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET read_at = ? WHERE user_id = ? AND read_at IS NULL",
        )
        .bind(timestamp::format(now))
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(&self, id: i64, user_id: i64) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn create_log(
        &self,
        user_id: i64,
        notification_id: Option<i64>,
        channel: NotificationChannel,
        message: &str,
        now: DateTime<Utc>,
    ) -> DatabaseResult<NotificationLog> {
        let log = sqlx::query_as::<_, NotificationLog>(
            "INSERT INTO notification_logs (user_id, notification_id, channel, message, status, created_at)
             VALUES (?, ?, ?, ?, 'pending', ?) RETURNING *",
        )
        .bind(user_id)
        .bind(notification_id)
        .bind(channel)
        .bind(message)
        .bind(timestamp::format(now))
        .fetch_one(&self.pool)
        .await?;
        Ok(log)
    }

    /// Record the delivery outcome of a log row.
    pub async fn set_log_status(
        &self,
        log_id: i64,
        status: DeliveryStatus,
        error_message: Option<&str>,
        now: DateTime<Utc>,
    ) -> DatabaseResult<NotificationLog> {
        let sent_at = matches!(status, DeliveryStatus::Sent).then(|| timestamp::format(now));
        let log = sqlx::query_as::<_, NotificationLog>(
            "UPDATE notification_logs SET status = ?, error_message = ?, sent_at = COALESCE(?, sent_at)
             WHERE id = ? RETURNING *",
        )
        .bind(status)
        .bind(error_message)
        .bind(sent_at)
        .bind(log_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(log)
    }

    pub async fn list_logs(&self, user_id: i64, page: Page) -> DatabaseResult<Vec<NotificationLog>> {
        let logs = sqlx::query_as::<_, NotificationLog>(
            "SELECT * FROM notification_logs WHERE user_id = ?
             ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
        )
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(logs)
    }

    pub async fn mark_log_read(
        &self,
        log_id: i64,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> DatabaseResult<Option<NotificationLog>> {
        let log = sqlx::query_as::<_, NotificationLog>(
            "UPDATE notification_logs SET status = 'read', read_at = COALESCE(read_at, ?)
             WHERE id = ? AND user_id = ?
             RETURNING *",
        )
        .bind(timestamp::format(now))
        .bind(log_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(log)
    }
}

pub(crate) async fn insert_notification(
    conn: &mut SqliteConnection,
    user_id: i64,
    kind: NotificationType,
    message: &str,
    now: DateTime<Utc>,
) -> DatabaseResult<Notification> {
    let notification = sqlx::query_as::<_, Notification>(
        "INSERT INTO notifications (user_id, type, message, sent_at) VALUES (?, ?, ?, ?) RETURNING *",
    )
    .bind(user_id)
    .bind(kind)
    .bind(message)
    .bind(timestamp::format(now))
    .fetch_one(&mut *conn)
    .await?;
    Ok(notification)
}
