//! Profiles, preferences and role management.

use chrono::Utc;
use cleancycle_auth::Authenticator;
use cleancycle_database::{
    ActivityLog, ActivityRepository, ActivityType, LaundrySessionRepository, NewActivity, Page,
    PreferencesRepository, PreferencesUpdate, ProfileUpdate, RoomRepository, User,
    UserPreferences, UserRepository, UserRole,
};
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::stats::{self, LifetimeStats};
use crate::types::{LaundryError, LaundryResult, MAX_REMINDER_MINUTES};
use crate::utils::PermissionChecker;

pub struct UserService {
    users: UserRepository,
    preferences: PreferencesRepository,
    rooms: RoomRepository,
    sessions: LaundrySessionRepository,
    activity: ActivityRepository,
    authenticator: Authenticator,
    supported_locales: Vec<String>,
}

impl UserService {
    pub fn new(pool: SqlitePool, authenticator: Authenticator, supported_locales: Vec<String>) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            preferences: PreferencesRepository::new(pool.clone()),
            rooms: RoomRepository::new(pool.clone()),
            sessions: LaundrySessionRepository::new(pool.clone()),
            activity: ActivityRepository::new(pool),
            authenticator,
            supported_locales,
        }
    }

    pub async fn profile(&self, user: &User) -> LaundryResult<User> {
        self.users
            .find_by_id(user.id)
            .await?
            .ok_or_else(|| LaundryError::not_found("user", &user.public_id))
    }

    pub async fn update_profile(&self, user: &User, update: &ProfileUpdate) -> LaundryResult<User> {
        if update.is_empty() {
            return Err(LaundryError::validation("nothing to update"));
        }
        for name in [&update.first_name, &update.last_name].into_iter().flatten() {
            if name.trim().is_empty() {
                return Err(LaundryError::validation("names may not be blank"));
            }
        }
        if let Some(Some(room_id)) = update.room_id {
            if self.rooms.find_by_id(room_id).await?.is_none() {
                return Err(LaundryError::not_found("room", room_id));
            }
        }

        let updated = self.users.update_profile(user.id, update, Utc::now()).await?;
        self.record(
            NewActivity::new(ActivityType::ProfileUpdated, "Updated profile").user(user.id),
        )
        .await;
        Ok(updated)
    }

    pub async fn preferences(&self, user: &User) -> LaundryResult<UserPreferences> {
        Ok(self.preferences.get_or_create(user.id, Utc::now()).await?)
    }

    pub async fn update_preferences(
        &self,
        user: &User,
        update: &PreferencesUpdate,
    ) -> LaundryResult<UserPreferences> {
        if let Some(language) = &update.language {
            if !self.supported_locales.iter().any(|locale| locale == language) {
                return Err(LaundryError::validation(format!(
                    "unsupported language: {language}"
                )));
            }
        }
        if let Some(minutes) = update.notification_reminder_minutes {
            if !(0..=MAX_REMINDER_MINUTES).contains(&minutes) {
                return Err(LaundryError::validation(format!(
                    "reminder minutes must be between 0 and {MAX_REMINDER_MINUTES}"
                )));
            }
        }

        Ok(self.preferences.update(user.id, update, Utc::now()).await?)
    }

    pub async fn change_password(
        &self,
        user: &User,
        current_password: &str,
        new_password: &str,
    ) -> LaundryResult<()> {
        self.authenticator
            .change_password(user.id, current_password, new_password)
            .await?;
        self.record(
            NewActivity::new(ActivityType::PasswordChanged, "Changed password").user(user.id),
        )
        .await;
        Ok(())
    }

    /// Lifetime totals over the user's finished sessions.
    pub async fn statistics(&self, user: &User) -> LaundryResult<LifetimeStats> {
        let sessions = self.sessions.finished_for_user(user.id, None).await?;
        Ok(stats::lifetime(&sessions, Utc::now()))
    }

    pub async fn activity(&self, user: &User, limit: Option<i64>) -> LaundryResult<Vec<ActivityLog>> {
        Ok(self
            .activity
            .list_for_user(user.id, Page::new(limit, None))
            .await?)
    }

    pub async fn list_users(
        &self,
        actor: &User,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> LaundryResult<Vec<User>> {
        PermissionChecker::require_staff(actor)?;
        Ok(self.users.list(Page::new(limit, offset)).await?)
    }

    pub async fn change_role(
        &self,
        actor: &User,
        public_id: &str,
        role: UserRole,
    ) -> LaundryResult<User> {
        PermissionChecker::require_admin(actor)?;
        let target = self
            .users
            .find_by_public_id(public_id)
            .await?
            .ok_or_else(|| LaundryError::not_found("user", public_id))?;
        if target.id == actor.id {
            return Err(LaundryError::permission_denied("admins cannot change their own role"));
        }

        let updated = self.users.update_role(target.id, role, Utc::now()).await?;
        self.record(
            NewActivity::new(ActivityType::RoleChanged, "Changed user role")
                .user(actor.id)
                .details(json!({
                    "target": target.public_id,
                    "from": target.role,
                    "to": role,
                })),
        )
        .await;
        info!(target = %target.public_id, from = %target.role, to = %role, "role changed");
        Ok(updated)
    }

    async fn record(&self, activity: NewActivity) {
        if let Err(err) = self.activity.record(&activity, Utc::now()).await {
            warn!(error = %err, "failed to record user activity");
        }
    }
}
