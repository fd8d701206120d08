use std::str::FromStr;
use std::sync::Arc;

use chrono::{Duration, Utc};
use cleancycle_auth::{AuthError, Authenticator, Registration};
use cleancycle_config::AuthConfig;
use cleancycle_database::timestamp;
use cleancycle_mail::MemoryMailer;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Row, SqlitePool,
};
use tempfile::TempDir;

type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

fn default_auth_config() -> AuthConfig {
    AuthConfig {
        session_ttl_seconds: 3_600,
        ..AuthConfig::default()
    }
}

struct TestContext {
    pool: SqlitePool,
    authenticator: Authenticator,
    mailer: MemoryMailer,
    _temp_dir: TempDir,
    config: AuthConfig,
}

impl TestContext {
    async fn new(config: AuthConfig) -> TestResult<Self> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("auth.sqlite");
        let db_url = format!("sqlite://{}", db_path.display());

        let mut options = SqliteConnectOptions::from_str(&db_url)?;
        options = options.create_if_missing(true);
        options = options.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        MIGRATOR.run(&pool).await?;

        let mailer = MemoryMailer::new();
        let authenticator = Authenticator::new(pool.clone(), &config, Arc::new(mailer.clone()));

        Ok(Self {
            pool,
            authenticator,
            mailer,
            _temp_dir: temp_dir,
            config,
        })
    }

    async fn new_default() -> TestResult<Self> {
        Self::new(default_auth_config()).await
    }

    fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    /// Register and verify, returning the user's email.
    async fn verified_user(&self, email: &str, username: &str) -> TestResult<String> {
        let registered = self
            .authenticator()
            .register(&registration(email, username), "en")
            .await?;
        let code = registered.verification_code.ok_or("debug builds return the code")?;
        self.authenticator().verify_email(email, &code).await?;
        Ok(email.to_string())
    }

    /// Backdate the last code send so the resend cooldown has passed.
    async fn age_code(&self, email: &str, seconds: i64) -> TestResult {
        let sent = timestamp::format(Utc::now() - Duration::seconds(seconds));
        sqlx::query("UPDATE users SET verification_code_sent_at = ? WHERE email = ?")
            .bind(sent)
            .bind(email)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}

fn registration(email: &str, username: &str) -> Registration {
    Registration {
        email: email.to_string(),
        password: "s3cret-pass".to_string(),
        username: username.to_string(),
        first_name: "Anna".to_string(),
        last_name: "Kovacs".to_string(),
        phone: Some("+36 30 123 4567".to_string()),
        apartment_number: Some("4B".to_string()),
        room_id: None,
    }
}

#[tokio::test]
async fn register_persists_user_and_password_identity() -> TestResult {
    let ctx = TestContext::new_default().await?;

    let registered = ctx
        .authenticator()
        .register(&registration("Anna@Example.com", "anna"), "en")
        .await?;
    let user = registered.user;

    assert_eq!(user.email, "anna@example.com");
    assert_eq!(user.name, "Anna Kovacs");
    assert_eq!(user.apartment_number.as_deref(), Some("4B"));
    assert!(!user.email_verified);

    let identity =
        sqlx::query("SELECT provider, secret FROM user_identities WHERE user_id = ?")
            .bind(user.id)
            .fetch_one(ctx.pool())
            .await?;
    let provider: String = identity.get("provider");
    let secret: String = identity.get("secret");
    assert_eq!(provider, "password");
    assert!(secret.starts_with("$argon2"), "secret must be an argon2 hash");

    Ok(())
}

#[tokio::test]
async fn register_stores_hashed_code_and_mails_it() -> TestResult {
    let ctx = TestContext::new_default().await?;

    let registered = ctx
        .authenticator()
        .register(&registration("anna@example.com", "anna"), "hu")
        .await?;
    let code = registered.verification_code.ok_or("missing code")?;
    assert_eq!(code.len(), 6);

    let stored: String =
        sqlx::query_scalar("SELECT verification_code_hash FROM users WHERE id = ?")
            .bind(registered.user.id)
            .fetch_one(ctx.pool())
            .await?;
    assert_ne!(stored, code);
    assert!(stored.starts_with("$argon2"));

    let mail = ctx.mailer.last_to("anna@example.com").ok_or("no mail sent")?;
    assert_eq!(mail.subject, "Email cím megerősítése - CleanCycle");
    assert!(mail.text.contains(&code));

    Ok(())
}

#[tokio::test]
async fn register_rejects_duplicate_email_and_username() -> TestResult {
    let ctx = TestContext::new_default().await?;
    ctx.authenticator()
        .register(&registration("anna@example.com", "anna"), "en")
        .await?;

    let err = ctx
        .authenticator()
        .register(&registration("ANNA@example.com", "other"), "en")
        .await
        .expect_err("expected duplicate email to fail");
    assert!(matches!(err, AuthError::UserExists(ref field) if field == "email"));

    let err = ctx
        .authenticator()
        .register(&registration("second@example.com", "anna"), "en")
        .await
        .expect_err("expected duplicate username to fail");
    assert!(matches!(err, AuthError::UserExists(ref field) if field == "username"));

    let user_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(ctx.pool())
        .await?;
    assert_eq!(user_count, 1, "no additional users should be created");

    Ok(())
}

#[tokio::test]
async fn register_validates_input() -> TestResult {
    let ctx = TestContext::new_default().await?;

    let mut short_password = registration("anna@example.com", "anna");
    short_password.password = "short".to_string();
    let err = ctx.authenticator().register(&short_password, "en").await.unwrap_err();
    assert!(matches!(err, AuthError::Validation(_)));

    let bad_email = registration("not-an-email", "anna");
    let err = ctx.authenticator().register(&bad_email, "en").await.unwrap_err();
    assert!(matches!(err, AuthError::Validation(_)));

    Ok(())
}

#[tokio::test]
async fn register_rejects_unknown_room() -> TestResult {
    let ctx = TestContext::new_default().await?;

    let mut homeless = registration("anna@example.com", "anna");
    homeless.room_id = Some(9_999);
    let err = ctx.authenticator().register(&homeless, "en").await.unwrap_err();
    assert!(matches!(err, AuthError::Validation(ref message) if message.contains("9999")));

    let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(ctx.pool())
        .await?;
    assert_eq!(stored, 0);

    Ok(())
}

#[tokio::test]
async fn login_requires_verified_email() -> TestResult {
    let ctx = TestContext::new_default().await?;
    ctx.authenticator()
        .register(&registration("anna@example.com", "anna"), "en")
        .await?;

    let err = ctx
        .authenticator()
        .login("anna@example.com", "s3cret-pass", false)
        .await
        .expect_err("unverified login should fail");
    assert!(matches!(err, AuthError::EmailNotVerified));

    let session_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM auth_sessions")
        .fetch_one(ctx.pool())
        .await?;
    assert_eq!(session_count, 0);

    Ok(())
}

#[tokio::test]
async fn login_returns_session_with_configured_ttl() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let email = ctx.verified_user("anna@example.com", "anna").await?;

    let outcome = ctx.authenticator().login(&email, "s3cret-pass", false).await?;

    let ttl = Duration::seconds(ctx.config.session_ttl_seconds as i64);
    let remaining = outcome.session.expires_at - Utc::now();
    assert!(
        (remaining - ttl).num_seconds().abs() <= 2,
        "session ttl should respect configuration"
    );
    assert!(outcome.user.last_login.is_some());
    assert!(!outcome.user.remember_me);

    let remembered = ctx.authenticator().login(&email, "s3cret-pass", true).await?;
    let remaining = remembered.session.expires_at - Utc::now();
    assert!(remaining > Duration::days(29));
    assert!(remembered.user.remember_me);

    Ok(())
}

#[tokio::test]
async fn login_rejects_incorrect_secret_and_unknown_email() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let email = ctx.verified_user("anna@example.com", "anna").await?;

    let err = ctx
        .authenticator()
        .login(&email, "bad-secret", false)
        .await
        .expect_err("expected invalid password");
    assert!(matches!(err, AuthError::InvalidCredentials));

    let err = ctx
        .authenticator()
        .login("unknown@example.com", "s3cret-pass", false)
        .await
        .expect_err("expected unknown email to fail");
    assert!(matches!(err, AuthError::InvalidCredentials));

    Ok(())
}

#[tokio::test]
async fn authenticate_token_and_logout() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let email = ctx.verified_user("anna@example.com", "anna").await?;
    let outcome = ctx.authenticator().login(&email, "s3cret-pass", false).await?;

    let (user, session) = ctx
        .authenticator()
        .authenticate_token(&outcome.session.token)
        .await?;
    assert_eq!(user.id, outcome.user.id);
    assert_eq!(session.token, outcome.session.token);

    ctx.authenticator().logout(&outcome.session.token).await?;
    let err = ctx
        .authenticator()
        .authenticate_token(&outcome.session.token)
        .await
        .expect_err("logged out token should be rejected");
    assert!(matches!(err, AuthError::SessionNotFound));

    let err = ctx.authenticator().logout(&outcome.session.token).await.unwrap_err();
    assert!(matches!(err, AuthError::SessionNotFound));

    Ok(())
}

#[tokio::test]
async fn authenticate_token_rejects_and_removes_expired_sessions() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let email = ctx.verified_user("anna@example.com", "anna").await?;
    let outcome = ctx.authenticator().login(&email, "s3cret-pass", false).await?;

    let past = timestamp::format(Utc::now() - Duration::minutes(5));
    sqlx::query("UPDATE auth_sessions SET expires_at = ? WHERE token = ?")
        .bind(past)
        .bind(&outcome.session.token)
        .execute(ctx.pool())
        .await?;

    let err = ctx
        .authenticator()
        .authenticate_token(&outcome.session.token)
        .await
        .expect_err("expired session should fail");
    assert!(matches!(err, AuthError::SessionExpired));

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM auth_sessions WHERE token = ?")
        .bind(&outcome.session.token)
        .fetch_one(ctx.pool())
        .await?;
    assert_eq!(remaining, 0, "expired session should be deleted");

    Ok(())
}

#[tokio::test]
async fn purge_drops_only_expired_tokens() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let email = ctx.verified_user("anna@example.com", "anna").await?;
    let stale = ctx.authenticator().login(&email, "s3cret-pass", false).await?;
    let live = ctx.authenticator().login(&email, "s3cret-pass", true).await?;

    sqlx::query("UPDATE auth_sessions SET expires_at = ? WHERE token = ?")
        .bind(timestamp::format(Utc::now() - Duration::hours(1)))
        .bind(&stale.session.token)
        .execute(ctx.pool())
        .await?;

    assert_eq!(ctx.authenticator().purge_expired_sessions().await?, 1);
    ctx.authenticator()
        .authenticate_token(&live.session.token)
        .await?;

    Ok(())
}

#[tokio::test]
async fn verify_email_accepts_code_once() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let registered = ctx
        .authenticator()
        .register(&registration("anna@example.com", "anna"), "en")
        .await?;
    let code = registered.verification_code.ok_or("missing code")?;

    let user = ctx.authenticator().verify_email("anna@example.com", &code).await?;
    assert!(user.email_verified);
    assert!(user.verification_code_hash.is_none());

    let err = ctx
        .authenticator()
        .verify_email("anna@example.com", &code)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::AlreadyVerified));

    Ok(())
}

#[tokio::test]
async fn verify_email_rejects_malformed_and_expired_codes() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let registered = ctx
        .authenticator()
        .register(&registration("anna@example.com", "anna"), "en")
        .await?;
    let code = registered.verification_code.ok_or("missing code")?;

    let err = ctx
        .authenticator()
        .verify_email("anna@example.com", "12345")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Validation(_)));

    let err = ctx
        .authenticator()
        .verify_email("nobody@example.com", &code)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::UserNotFound));

    let past = timestamp::format(Utc::now() - Duration::minutes(1));
    sqlx::query("UPDATE users SET verification_code_expires_at = ? WHERE email = ?")
        .bind(past)
        .bind("anna@example.com")
        .execute(ctx.pool())
        .await?;

    let err = ctx
        .authenticator()
        .verify_email("anna@example.com", &code)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::CodeExpired));

    Ok(())
}

#[tokio::test]
async fn five_wrong_codes_lock_verification_until_resend() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let registered = ctx
        .authenticator()
        .register(&registration("anna@example.com", "anna"), "en")
        .await?;
    let code = registered.verification_code.ok_or("missing code")?;
    let wrong = if code == "999999" { "100000" } else { "999999" };

    for _ in 0..4 {
        let err = ctx
            .authenticator()
            .verify_email("anna@example.com", wrong)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCode));
    }

    let err = ctx
        .authenticator()
        .verify_email("anna@example.com", wrong)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::TooManyAttempts));

    let err = ctx
        .authenticator()
        .verify_email("anna@example.com", &code)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::TooManyAttempts), "the right code no longer works");

    ctx.age_code("anna@example.com", 120).await?;
    let fresh = ctx
        .authenticator()
        .resend_verification("anna@example.com", "en")
        .await?
        .ok_or("missing resent code")?;
    let user = ctx.authenticator().verify_email("anna@example.com", &fresh).await?;
    assert!(user.email_verified);

    Ok(())
}

#[tokio::test]
async fn resend_is_throttled_by_cooldown() -> TestResult {
    let ctx = TestContext::new_default().await?;
    ctx.authenticator()
        .register(&registration("anna@example.com", "anna"), "en")
        .await?;

    let err = ctx
        .authenticator()
        .resend_verification("anna@example.com", "en")
        .await
        .unwrap_err();
    match err {
        AuthError::ResendTooSoon { retry_after_seconds } => {
            assert!((1..=60).contains(&retry_after_seconds));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    ctx.age_code("anna@example.com", 61).await?;
    let code = ctx
        .authenticator()
        .resend_verification("anna@example.com", "en")
        .await?;
    assert!(code.is_some());
    assert_eq!(ctx.mailer.sent().len(), 2);

    Ok(())
}

#[tokio::test]
async fn resend_refuses_verified_accounts() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let email = ctx.verified_user("anna@example.com", "anna").await?;

    let err = ctx
        .authenticator()
        .resend_verification(&email, "en")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::AlreadyVerified));
    Ok(())
}

#[tokio::test]
async fn change_password_requires_current_password() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let email = ctx.verified_user("anna@example.com", "anna").await?;
    let outcome = ctx.authenticator().login(&email, "s3cret-pass", false).await?;
    let user_id = outcome.user.id;

    let err = ctx
        .authenticator()
        .change_password(user_id, "wrong-pass", "brand-new-pass")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));

    let err = ctx
        .authenticator()
        .change_password(user_id, "s3cret-pass", "short")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Validation(_)));

    ctx.authenticator()
        .change_password(user_id, "s3cret-pass", "brand-new-pass")
        .await?;
    assert!(ctx.authenticator().login(&email, "s3cret-pass", false).await.is_err());
    ctx.authenticator().login(&email, "brand-new-pass", false).await?;

    Ok(())
}
