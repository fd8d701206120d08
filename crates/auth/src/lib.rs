use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{Duration, Utc};
use cleancycle_config::AuthConfig;
use cleancycle_database::{
    AuthSession, AuthSessionRepository, DatabaseError, NewUser, RoomRepository, User,
    UserRepository,
};
use cleancycle_mail::{templates, SharedMailer};
use rand::RngCore;
use serde::Deserialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod password;
pub mod validation;
pub mod verification;

#[derive(Clone)]
pub struct Authenticator {
    pool: SqlitePool,
    mailer: SharedMailer,
    session_ttl: Duration,
    remember_me_ttl: Duration,
    code_ttl: Duration,
    max_attempts: i64,
    resend_cooldown: Duration,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("{0} is already registered")]
    UserExists(String),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("email address is not verified")]
    EmailNotVerified,
    #[error("user not found")]
    UserNotFound,
    #[error("email is already verified")]
    AlreadyVerified,
    #[error("invalid verification code")]
    InvalidCode,
    #[error("verification code expired")]
    CodeExpired,
    #[error("too many failed attempts, request a new code")]
    TooManyAttempts,
    #[error("a code was sent recently, retry in {retry_after_seconds}s")]
    ResendTooSoon { retry_after_seconds: i64 },
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("password hashing failed: {0}")]
    PasswordHash(#[from] argon2::password_hash::Error),
    #[error("session not found")]
    SessionNotFound,
    #[error("session expired")]
    SessionExpired,
    #[error("invalid session token")]
    InvalidSession,
}

/// Registration form.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub apartment_number: Option<String>,
    pub room_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct Registered {
    pub user: User,
    /// Only populated in debug builds.
    pub verification_code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: User,
    pub session: AuthSession,
}

impl Authenticator {
    pub fn new(pool: SqlitePool, config: &AuthConfig, mailer: SharedMailer) -> Self {
        Self {
            pool,
            mailer,
            session_ttl: seconds(config.session_ttl_seconds),
            remember_me_ttl: seconds(config.remember_me_ttl_seconds),
            code_ttl: seconds(config.verification_code_ttl_seconds),
            max_attempts: i64::from(config.verification_max_attempts.max(1)),
            resend_cooldown: seconds(config.verification_resend_cooldown_seconds),
        }
    }

    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }

    fn sessions(&self) -> AuthSessionRepository {
        AuthSessionRepository::new(self.pool.clone())
    }

    /// Create an unverified account and mail its first verification code.
    pub async fn register(
        &self,
        registration: &Registration,
        locale: &str,
    ) -> Result<Registered, AuthError> {
        validate_registration(registration)?;
        if let Some(room_id) = registration.room_id {
            let rooms = RoomRepository::new(self.pool.clone());
            if rooms.find_by_id(room_id).await?.is_none() {
                return Err(AuthError::Validation(format!("room {room_id} does not exist")));
            }
        }

        let now = Utc::now();
        let password_hash = password::hash_secret(&registration.password)?;
        let code = verification::generate_code();
        let code_hash = password::hash_secret(&code)?;

        let new_user = NewUser {
            email: registration.email.clone(),
            username: registration.username.clone(),
            first_name: registration.first_name.trim().to_string(),
            last_name: registration.last_name.trim().to_string(),
            phone: non_empty(registration.phone.as_deref()),
            apartment_number: non_empty(registration.apartment_number.as_deref()),
            room_id: registration.room_id,
        };

        let user = self
            .users()
            .create_with_password(
                &new_user,
                &password_hash,
                &code_hash,
                verification::expires_at(now, self.code_ttl),
                now,
            )
            .await
            .map_err(|err| match err {
                DatabaseError::Duplicate(field) => AuthError::UserExists(field),
                DatabaseError::ValidationError(message) => AuthError::Validation(message),
                other => AuthError::Database(other),
            })?;

        info!(user = %user.public_id, "registered user");
        self.deliver_code(&user.email, &code, locale).await;

        Ok(Registered {
            user,
            verification_code: cfg!(debug_assertions).then_some(code),
        })
    }

    pub async fn login(
        &self,
        email: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<LoginOutcome, AuthError> {
        let users = self.users();
        let Some(user) = users.find_by_email(email).await? else {
            return Err(AuthError::InvalidCredentials);
        };
        let Some(stored) = users.password_hash(user.id).await? else {
            return Err(AuthError::InvalidCredentials);
        };
        if !password::verify_secret(password, &stored)? {
            return Err(AuthError::InvalidCredentials);
        }
        if !user.email_verified {
            return Err(AuthError::EmailNotVerified);
        }

        let now = Utc::now();
        let ttl = if remember_me {
            self.remember_me_ttl
        } else {
            self.session_ttl
        };

        let token = generate_session_token();
        let session = self
            .sessions()
            .create(&token, user.id, now + ttl, now)
            .await?;
        users.record_login(user.id, remember_me, now).await?;

        let user = users.find_by_id(user.id).await?.unwrap_or(user);
        info!(user = %user.public_id, remember_me, "user logged in");
        Ok(LoginOutcome { user, session })
    }

    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        if self.sessions().delete_by_token(token).await? {
            Ok(())
        } else {
            Err(AuthError::SessionNotFound)
        }
    }

    pub async fn authenticate_token(&self, token: &str) -> Result<(User, AuthSession), AuthError> {
        let sessions = self.sessions();
        let Some(session) = sessions.find_by_token(token).await? else {
            return Err(AuthError::SessionNotFound);
        };

        if session.is_expired(Utc::now()) {
            sessions.delete_by_token(token).await?;
            return Err(AuthError::SessionExpired);
        }

        let user = self
            .users()
            .find_by_id(session.user_id)
            .await?
            .ok_or(AuthError::InvalidSession)?;

        Ok((user, session))
    }

    pub async fn verify_email(&self, email: &str, code: &str) -> Result<User, AuthError> {
        let code = code.trim();
        if !verification::is_well_formed(code) {
            return Err(AuthError::Validation(
                "verification code must be 6 digits".to_string(),
            ));
        }

        let users = self.users();
        let user = users
            .find_by_email(email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if user.email_verified {
            return Err(AuthError::AlreadyVerified);
        }
        if user.verification_attempts >= self.max_attempts {
            return Err(AuthError::TooManyAttempts);
        }
        let (Some(stored), Some(expires_at)) = (
            user.verification_code_hash.as_deref(),
            user.verification_code_expires_at,
        ) else {
            return Err(AuthError::InvalidCode);
        };

        let now = Utc::now();
        if expires_at < now {
            return Err(AuthError::CodeExpired);
        }

        if !password::verify_secret(code, stored)? {
            let attempts = users.record_failed_verification(user.id).await?;
            if attempts >= self.max_attempts {
                users.invalidate_verification_code(user.id).await?;
                warn!(user = %user.public_id, attempts, "verification code locked");
                return Err(AuthError::TooManyAttempts);
            }
            debug!(user = %user.public_id, attempts, "wrong verification code");
            return Err(AuthError::InvalidCode);
        }

        if !users.mark_verified(user.id, now).await? {
            return Err(AuthError::AlreadyVerified);
        }

        info!(user = %user.public_id, "email verified");
        users
            .find_by_id(user.id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Issue a fresh code, throttled by the resend cooldown. Returns the
    /// code in debug builds.
    pub async fn resend_verification(
        &self,
        email: &str,
        locale: &str,
    ) -> Result<Option<String>, AuthError> {
        let users = self.users();
        let user = users
            .find_by_email(email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if user.email_verified {
            return Err(AuthError::AlreadyVerified);
        }

        let now = Utc::now();
        if let Some(retry_after_seconds) =
            verification::resend_wait(user.verification_code_sent_at, self.resend_cooldown, now)
        {
            return Err(AuthError::ResendTooSoon {
                retry_after_seconds,
            });
        }

        let code = verification::generate_code();
        let code_hash = password::hash_secret(&code)?;
        users
            .set_verification_code(
                user.id,
                &code_hash,
                verification::expires_at(now, self.code_ttl),
                now,
            )
            .await?;

        self.deliver_code(&user.email, &code, locale).await;
        Ok(cfg!(debug_assertions).then_some(code))
    }

    pub async fn change_password(
        &self,
        user_id: i64,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        if !validation::is_valid_password(new_password) {
            return Err(AuthError::Validation(format!(
                "password must be at least {} characters",
                validation::MIN_PASSWORD_LENGTH
            )));
        }

        let users = self.users();
        let stored = users
            .password_hash(user_id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        if !password::verify_secret(current_password, &stored)? {
            return Err(AuthError::InvalidCredentials);
        }

        let hash = password::hash_secret(new_password)?;
        users.update_password_hash(user_id, &hash, Utc::now()).await?;
        info!(user_id, "password changed");
        Ok(())
    }

    /// Drop bearer tokens whose expiry has passed.
    pub async fn purge_expired_sessions(&self) -> Result<u64, AuthError> {
        Ok(self.sessions().delete_expired(Utc::now()).await?)
    }

    async fn deliver_code(&self, email: &str, code: &str, locale: &str) {
        let mail = templates::verification_email(email, code, locale);
        if let Err(err) = self.mailer.send(&mail).await {
            warn!(error = %err, "failed to send verification email");
        }
    }
}

fn validate_registration(registration: &Registration) -> Result<(), AuthError> {
    if !validation::is_valid_email(&registration.email) {
        return Err(AuthError::Validation("invalid email address".to_string()));
    }
    if !validation::is_valid_password(&registration.password) {
        return Err(AuthError::Validation(format!(
            "password must be at least {} characters",
            validation::MIN_PASSWORD_LENGTH
        )));
    }
    if !validation::is_valid_username(&registration.username) {
        return Err(AuthError::Validation(
            "username must be 3-32 letters, digits, '.', '_' or '-'".to_string(),
        ));
    }
    if registration.first_name.trim().is_empty() || registration.last_name.trim().is_empty() {
        return Err(AuthError::Validation(
            "first and last name are required".to_string(),
        ));
    }
    Ok(())
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

// A century; keeps `now + ttl` far from chrono's range limits.
const MAX_TTL_SECONDS: u64 = 100 * 365 * 86_400;

fn seconds(value: u64) -> Duration {
    Duration::seconds(value.min(MAX_TTL_SECONDS) as i64)
}

fn generate_session_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
