//! In-app notifications and their per-channel delivery logs.

use chrono::Utc;
use cleancycle_database::{
    DeliveryStatus, Notification, NotificationChannel, NotificationLog, NotificationRepository,
    NotificationType, Page, PreferencesRepository, User, UserRepository,
};
use cleancycle_mail::{templates, SharedMailer};
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::types::{LaundryError, LaundryResult, NotificationList};

pub struct NotificationService {
    notifications: NotificationRepository,
    preferences: PreferencesRepository,
    users: UserRepository,
    mailer: SharedMailer,
}

impl NotificationService {
    pub fn new(pool: SqlitePool, mailer: SharedMailer) -> Self {
        Self {
            notifications: NotificationRepository::new(pool.clone()),
            preferences: PreferencesRepository::new(pool.clone()),
            users: UserRepository::new(pool),
            mailer,
        }
    }

    /// Latest first, with the unread total.
    pub async fn list(&self, user: &User, limit: Option<i64>) -> LaundryResult<NotificationList> {
        let notifications = self
            .notifications
            .list_for_user(user.id, Page::new(limit, None))
            .await?;
        let unread_count = self.notifications.unread_count(user.id).await?;
        Ok(NotificationList {
            notifications,
            unread_count,
        })
    }

    pub async fn unread_count(&self, user: &User) -> LaundryResult<i64> {
        Ok(self.notifications.unread_count(user.id).await?)
    }

    pub async fn mark_read(&self, user: &User, notification_id: i64) -> LaundryResult<Notification> {
        self.notifications
            .mark_read(notification_id, user.id, Utc::now())
            .await?
            .ok_or_else(|| LaundryError::not_found("notification", notification_id))
    }

    pub async fn mark_all_read(&self, user: &User) -> LaundryResult<u64> {
        Ok(self.notifications.mark_all_read(user.id, Utc::now()).await?)
    }

    pub async fn delete(&self, user: &User, notification_id: i64) -> LaundryResult<()> {
        if self.notifications.delete(notification_id, user.id).await? {
            Ok(())
        } else {
            Err(LaundryError::not_found("notification", notification_id))
        }
    }

    pub async fn logs(&self, user: &User, limit: Option<i64>) -> LaundryResult<Vec<NotificationLog>> {
        Ok(self
            .notifications
            .list_logs(user.id, Page::new(limit, None))
            .await?)
    }

    pub async fn mark_log_read(&self, user: &User, log_id: i64) -> LaundryResult<NotificationLog> {
        self.notifications
            .mark_log_read(log_id, user.id, Utc::now())
            .await?
            .ok_or_else(|| LaundryError::not_found("notification log", log_id))
    }

    /// Create a notification and deliver it on the user's enabled channels.
    pub async fn notify(
        &self,
        user_id: i64,
        kind: NotificationType,
        message: &str,
    ) -> LaundryResult<Notification> {
        let notification = self
            .notifications
            .create(user_id, kind, message, Utc::now())
            .await?;
        self.deliver(&notification).await?;
        Ok(notification)
    }

    /// Deliver a notification that was written elsewhere, e.g. inside the
    /// session close transaction.
    pub async fn deliver_stored(&self, notification_id: i64) -> LaundryResult<Vec<NotificationLog>> {
        let notification = self
            .notifications
            .find_by_id(notification_id)
            .await?
            .ok_or_else(|| LaundryError::not_found("notification", notification_id))?;
        self.deliver(&notification).await
    }

    /// Write one delivery log per enabled channel. In-app is delivered
    /// immediately, email goes through the mailer, push stays pending.
    pub async fn deliver(&self, notification: &Notification) -> LaundryResult<Vec<NotificationLog>> {
        let now = Utc::now();
        let preferences = self
            .preferences
            .get_or_create(notification.user_id, now)
            .await?;

        let mut logs = Vec::new();
        for channel in preferences.enabled_channels() {
            let log = self
                .notifications
                .create_log(
                    notification.user_id,
                    Some(notification.id),
                    channel,
                    &notification.message,
                    now,
                )
                .await?;

            let log = match channel {
                NotificationChannel::InApp => {
                    self.notifications
                        .set_log_status(log.id, DeliveryStatus::Sent, None, Utc::now())
                        .await?
                }
                NotificationChannel::Email => {
                    self.send_email(notification, &preferences.language, log).await?
                }
                NotificationChannel::Push => {
                    debug!(log_id = log.id, "no push provider, leaving delivery pending");
                    log
                }
            };
            logs.push(log);
        }

        Ok(logs)
    }

    /// An in-app notification for every user, used for critical machine faults.
    pub async fn broadcast_in_app(
        &self,
        kind: NotificationType,
        message: &str,
    ) -> LaundryResult<usize> {
        let user_ids = self.users.all_ids().await?;
        for user_id in &user_ids {
            let now = Utc::now();
            let notification = self.notifications.create(*user_id, kind, message, now).await?;
            let log = self
                .notifications
                .create_log(
                    *user_id,
                    Some(notification.id),
                    NotificationChannel::InApp,
                    message,
                    now,
                )
                .await?;
            self.notifications
                .set_log_status(log.id, DeliveryStatus::Sent, None, now)
                .await?;
        }
        Ok(user_ids.len())
    }

    async fn send_email(
        &self,
        notification: &Notification,
        language: &str,
        log: NotificationLog,
    ) -> LaundryResult<NotificationLog> {
        let Some(user) = self.users.find_by_id(notification.user_id).await? else {
            return Ok(self
                .notifications
                .set_log_status(log.id, DeliveryStatus::Failed, Some("user not found"), Utc::now())
                .await?);
        };

        let mail = templates::notification_email(&user.email, &notification.message, language);
        let updated = match self.mailer.send(&mail).await {
            Ok(()) => {
                self.notifications
                    .set_log_status(log.id, DeliveryStatus::Sent, None, Utc::now())
                    .await?
            }
            Err(err) => {
                warn!(notification_id = notification.id, error = %err, "email delivery failed");
                let reason = err.to_string();
                self.notifications
                    .set_log_status(log.id, DeliveryStatus::Failed, Some(&reason), Utc::now())
                    .await?
            }
        };
        Ok(updated)
    }
}
