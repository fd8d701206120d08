use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::notification::NotificationChannel;

/// Per-user notification settings. A row is created with defaults the first
/// time it is read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct UserPreferences {
    #[serde(skip_serializing)]
    pub id: i64,
    #[serde(skip_serializing)]
    pub user_id: i64,
    pub phone: Option<String>,
    pub language: String,
    pub email_notifications: bool,
    pub push_notifications: bool,
    pub in_app_notifications: bool,
    pub notification_reminder_minutes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserPreferences {
    pub const DEFAULT_LANGUAGE: &'static str = "en";
    pub const DEFAULT_REMINDER_MINUTES: i64 = 15;

    /// Channels a notification for this user should be logged on.
    pub fn enabled_channels(&self) -> Vec<NotificationChannel> {
        let mut channels = Vec::with_capacity(3);
        if self.in_app_notifications {
            channels.push(NotificationChannel::InApp);
        }
        if self.email_notifications {
            channels.push(NotificationChannel::Email);
        }
        if self.push_notifications {
            channels.push(NotificationChannel::Push);
        }
        channels
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct PreferencesUpdate {
    pub phone: Option<String>,
    pub language: Option<String>,
    pub email_notifications: Option<bool>,
    pub push_notifications: Option<bool>,
    pub in_app_notifications: Option<bool>,
    pub notification_reminder_minutes: Option<i64>,
}
