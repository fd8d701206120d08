use chrono::{DateTime, Utc};

/// Bearer token issued at login. Not to be confused with a laundry session.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct AuthSession {
    pub id: i64,
    pub token: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl AuthSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
