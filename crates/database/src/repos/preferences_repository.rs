use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::entities::{PreferencesUpdate, UserPreferences};
use crate::timestamp;
use crate::types::DatabaseResult;

pub struct PreferencesRepository {
    pool: SqlitePool,
}

impl PreferencesRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Fetch the user's preferences, inserting the defaults on first access.
    pub async fn get_or_create(&self, user_id: i64, now: DateTime<Utc>) -> DatabaseResult<UserPreferences> {
        let now = timestamp::format(now);
        sqlx::query(
            "INSERT INTO user_preferences (
                user_id, language, email_notifications, push_notifications, in_app_notifications,
                notification_reminder_minutes, created_at, updated_at
             ) VALUES (?, ?, 1, 1, 1, ?, ?, ?)
             ON CONFLICT(user_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(UserPreferences::DEFAULT_LANGUAGE)
        .bind(UserPreferences::DEFAULT_REMINDER_MINUTES)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let preferences =
            sqlx::query_as::<_, UserPreferences>("SELECT * FROM user_preferences WHERE user_id = ?")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(preferences)
    }

    pub async fn update(
        &self,
        user_id: i64,
        update: &PreferencesUpdate,
        now: DateTime<Utc>,
    ) -> DatabaseResult<UserPreferences> {
        self.get_or_create(user_id, now).await?;

        let preferences = sqlx::query_as::<_, UserPreferences>(
            "UPDATE user_preferences SET
                phone = COALESCE(?, phone),
                language = COALESCE(?, language),
                email_notifications = COALESCE(?, email_notifications),
                push_notifications = COALESCE(?, push_notifications),
                in_app_notifications = COALESCE(?, in_app_notifications),
                notification_reminder_minutes = COALESCE(?, notification_reminder_minutes),
                updated_at = ?
             WHERE user_id = ?
             RETURNING *",
        )
        .bind(&update.phone)
        .bind(&update.language)
        .bind(update.email_notifications)
        .bind(update.push_notifications)
        .bind(update.in_app_notifications)
        .bind(update.notification_reminder_minutes)
        .bind(timestamp::format(now))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(preferences)
    }
}
