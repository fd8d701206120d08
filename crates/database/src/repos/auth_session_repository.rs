use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::entities::AuthSession;
use crate::timestamp;
use crate::types::DatabaseResult;

/// Bearer token storage
pub struct AuthSessionRepository {
    pool: SqlitePool,
}

impl AuthSessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        token: &str,
        user_id: i64,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> DatabaseResult<AuthSession> {
        let session = sqlx::query_as::<_, AuthSession>(
            "INSERT INTO auth_sessions (token, user_id, expires_at, created_at)
             VALUES (?, ?, ?, ?) RETURNING *",
        )
        .bind(token)
        .bind(user_id)
        .bind(timestamp::format(expires_at))
        .bind(timestamp::format(now))
        .fetch_one(&self.pool)
        .await?;
        Ok(session)
    }

    pub async fn find_by_token(&self, token: &str) -> DatabaseResult<Option<AuthSession>> {
        let session = sqlx::query_as::<_, AuthSession>("SELECT * FROM auth_sessions WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(session)
    }

    /// Returns whether a session was removed.
    pub async fn delete_by_token(&self, token: &str) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM auth_sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_for_user(&self, user_id: i64) -> DatabaseResult<u64> {
        let result = sqlx::query("DELETE FROM auth_sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_expired(&self, now: DateTime<Utc>) -> DatabaseResult<u64> {
        let result = sqlx::query("DELETE FROM auth_sessions WHERE expires_at <= ?")
            .bind(timestamp::format(now))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
