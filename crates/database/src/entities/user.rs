//! User entity definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// A registered resident or staff member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct User {
    #[serde(skip_serializing)]
    pub id: i64,
    pub public_id: String,
    pub email: String,
    pub username: String,
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub apartment_number: Option<String>,
    pub room_id: Option<i64>,
    pub role: UserRole,
    pub email_verified: bool,
    #[serde(skip)]
    pub verification_code_hash: Option<String>,
    #[serde(skip)]
    pub verification_code_expires_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub verification_code_sent_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub verification_attempts: i64,
    pub remember_me: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub profile_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }
}

/// Fields collected at registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub apartment_number: Option<String>,
    pub room_id: Option<i64>,
}

impl NewUser {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }
}

/// Partial profile edit; a missing field leaves its column untouched.
///
/// The optional contact fields distinguish "absent" from an explicit `null`:
/// `Some(None)` clears the column.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub apartment_number: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<i64>)]
    pub room_id: Option<Option<i64>>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.phone.is_none()
            && self.apartment_number.is_none()
            && self.room_id.is_none()
    }
}

/// A field that appears in the payload, `null` included.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Manager,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Manager => "manager",
            UserRole::Admin => "admin",
        }
    }

    /// Managers and admins run the laundry room.
    pub fn is_staff(&self) -> bool {
        matches!(self, UserRole::Manager | UserRole::Admin)
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(UserRole::User),
            "manager" => Ok(UserRole::Manager),
            "admin" => Ok(UserRole::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_roles() {
        assert!(!UserRole::User.is_staff());
        assert!(UserRole::Manager.is_staff());
        assert!(UserRole::Admin.is_staff());
        assert_eq!("manager".parse::<UserRole>(), Ok(UserRole::Manager));
        assert!("owner".parse::<UserRole>().is_err());
    }

    #[test]
    fn profile_update_tells_null_from_absent() {
        let update: ProfileUpdate =
            serde_json::from_str(r#"{"phone": null, "room_id": 3}"#).unwrap();
        assert_eq!(update.phone, Some(None));
        assert_eq!(update.room_id, Some(Some(3)));
        assert_eq!(update.apartment_number, None);
        assert!(!update.is_empty());

        let empty: ProfileUpdate = serde_json::from_str("{}").unwrap();
        assert!(empty.is_empty());
    }
}
