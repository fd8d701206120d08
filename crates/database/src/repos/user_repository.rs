//! User repository for database operations.

use chrono::{DateTime, Utc};
use cuid2::CuidConstructor;
use once_cell::sync::Lazy;
use sqlx::SqlitePool;

use crate::entities::{NewUser, ProfileUpdate, User, UserRole};
use crate::timestamp;
use crate::types::{DatabaseError, DatabaseResult, Page};

static CUID: Lazy<CuidConstructor> = Lazy::new(CuidConstructor::new);

pub(crate) fn generate_public_id() -> String {
    CUID.create_id()
}

/// Repository for user database operations
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a user together with its password identity and first
    /// verification code.
    pub async fn create_with_password(
        &self,
        user: &NewUser,
        password_hash: &str,
        code_hash: &str,
        code_expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> DatabaseResult<User> {
        let email = user.email.trim().to_lowercase();
        let username = user.username.trim().to_string();

        let mut tx = self.pool.begin().await?;

        let taken: Option<(String, String)> =
            sqlx::query_as("SELECT email, username FROM users WHERE email = ? OR username = ?")
                .bind(&email)
                .bind(&username)
                .fetch_optional(&mut *tx)
                .await?;
        if let Some((existing_email, _)) = taken {
            let field = if existing_email == email { "email" } else { "username" };
            return Err(DatabaseError::Duplicate(field.to_string()));
        }

        let now_str = timestamp::format(now);
        let created = sqlx::query_as::<_, User>(
            "INSERT INTO users (
                public_id, email, username, name, first_name, last_name, phone, apartment_number,
                room_id, role, email_verified, verification_code_hash, verification_code_expires_at,
                verification_code_sent_at, verification_attempts, created_at, updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'user', 0, ?, ?, ?, 0, ?, ?)
             RETURNING *",
        )
        .bind(generate_public_id())
        .bind(&email)
        .bind(&username)
        .bind(user.display_name())
        .bind(user.first_name.trim())
        .bind(user.last_name.trim())
        .bind(&user.phone)
        .bind(&user.apartment_number)
        .bind(user.room_id)
        .bind(code_hash)
        .bind(timestamp::format(code_expires_at))
        .bind(&now_str)
        .bind(&now_str)
        .bind(&now_str)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO user_identities (user_id, provider, provider_uid, secret, created_at, updated_at)
             VALUES (?, 'password', ?, ?, ?, ?)",
        )
        .bind(created.id)
        .bind(&email)
        .bind(password_hash)
        .bind(&now_str)
        .bind(&now_str)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created)
    }

    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_public_id(&self, public_id: &str) -> DatabaseResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE public_id = ?")
            .bind(public_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Argon2 hash of the user's password identity.
    pub async fn password_hash(&self, user_id: i64) -> DatabaseResult<Option<String>> {
        let secret: Option<(Option<String>,)> = sqlx::query_as(
            "SELECT secret FROM user_identities WHERE user_id = ? AND provider = 'password'",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(secret.and_then(|(secret,)| secret))
    }

    pub async fn update_password_hash(
        &self,
        user_id: i64,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> DatabaseResult<()> {
        let result = sqlx::query(
            "UPDATE user_identities SET secret = ?, updated_at = ?
             WHERE user_id = ? AND provider = 'password'",
        )
        .bind(password_hash)
        .bind(timestamp::format(now))
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("password identity for user", user_id));
        }
        Ok(())
    }

    /// Store a fresh verification code and reset the attempt counter.
    pub async fn set_verification_code(
        &self,
        user_id: i64,
        code_hash: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> DatabaseResult<()> {
        let now = timestamp::format(now);
        sqlx::query(
            "UPDATE users SET verification_code_hash = ?, verification_code_expires_at = ?,
                verification_code_sent_at = ?, verification_attempts = 0, updated_at = ?
             WHERE id = ?",
        )
        .bind(code_hash)
        .bind(timestamp::format(expires_at))
        .bind(&now)
        .bind(&now)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Count a failed code submission and return the new attempt total.
    pub async fn record_failed_verification(&self, user_id: i64) -> DatabaseResult<i64> {
        let (attempts,): (i64,) = sqlx::query_as(
            "UPDATE users SET verification_attempts = verification_attempts + 1
             WHERE id = ? RETURNING verification_attempts",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(attempts)
    }

    /// Drop the stored code so only a resend can unlock verification.
    pub async fn invalidate_verification_code(&self, user_id: i64) -> DatabaseResult<()> {
        sqlx::query(
            "UPDATE users SET verification_code_hash = NULL, verification_code_expires_at = NULL
             WHERE id = ?",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Mark the email verified; `false` when it already was.
    pub async fn mark_verified(&self, user_id: i64, now: DateTime<Utc>) -> DatabaseResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET email_verified = 1, verification_code_hash = NULL,
                verification_code_expires_at = NULL, verification_attempts = 0, updated_at = ?
             WHERE id = ? AND email_verified = 0",
        )
        .bind(timestamp::format(now))
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn record_login(
        &self,
        user_id: i64,
        remember_me: bool,
        now: DateTime<Utc>,
    ) -> DatabaseResult<()> {
        let now = timestamp::format(now);
        sqlx::query("UPDATE users SET last_login = ?, remember_me = ?, updated_at = ? WHERE id = ?")
            .bind(&now)
            .bind(remember_me)
            .bind(&now)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn update_profile(
        &self,
        user_id: i64,
        update: &ProfileUpdate,
        now: DateTime<Utc>,
    ) -> DatabaseResult<User> {
        let now = timestamp::format(now);
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET
                first_name = COALESCE(?, first_name),
                last_name = COALESCE(?, last_name),
                phone = CASE WHEN ? THEN ? ELSE phone END,
                apartment_number = CASE WHEN ? THEN ? ELSE apartment_number END,
                room_id = CASE WHEN ? THEN ? ELSE room_id END,
                profile_updated_at = ?,
                updated_at = ?
             WHERE id = ?
             RETURNING *",
        )
        .bind(update.first_name.as_deref().map(str::trim))
        .bind(update.last_name.as_deref().map(str::trim))
        .bind(update.phone.is_some())
        .bind(update.phone.clone().flatten())
        .bind(update.apartment_number.is_some())
        .bind(update.apartment_number.clone().flatten())
        .bind(update.room_id.is_some())
        .bind(update.room_id.flatten())
        .bind(&now)
        .bind(&now)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("user", user_id))?;

        if update.first_name.is_some() || update.last_name.is_some() {
            let user = sqlx::query_as::<_, User>(
                "UPDATE users SET name = first_name || ' ' || last_name WHERE id = ? RETURNING *",
            )
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
            return Ok(user);
        }

        Ok(user)
    }

    pub async fn update_role(
        &self,
        user_id: i64,
        role: UserRole,
        now: DateTime<Utc>,
    ) -> DatabaseResult<User> {
        sqlx::query_as::<_, User>("UPDATE users SET role = ?, updated_at = ? WHERE id = ? RETURNING *")
            .bind(role)
            .bind(timestamp::format(now))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("user", user_id))
    }

    pub async fn list(&self, page: Page) -> DatabaseResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
        )
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    pub async fn count(&self) -> DatabaseResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn all_ids(&self) -> DatabaseResult<Vec<i64>> {
        let ids: Vec<(i64,)> = sqlx::query_as("SELECT id FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().map(|(id,)| id).collect())
    }
}
