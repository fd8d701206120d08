//! Audit trail rows: user-facing activity logs and operational machine logs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct ActivityLog {
    pub id: i64,
    pub user_id: Option<i64>,
    pub machine_id: Option<i64>,
    pub session_id: Option<i64>,
    pub action: String,
    pub action_type: ActivityType,
    #[schema(value_type = Option<Object>)]
    pub details: Option<Json<serde_json::Value>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewActivity {
    pub user_id: Option<i64>,
    pub machine_id: Option<i64>,
    pub session_id: Option<i64>,
    pub action: String,
    pub action_type: ActivityType,
    pub details: Option<serde_json::Value>,
}

impl NewActivity {
    pub fn new(action_type: ActivityType, action: impl Into<String>) -> Self {
        Self {
            user_id: None,
            machine_id: None,
            session_id: None,
            action: action.into(),
            action_type,
            details: None,
        }
    }

    pub fn user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn machine(mut self, machine_id: i64) -> Self {
        self.machine_id = Some(machine_id);
        self
    }

    pub fn session(mut self, session_id: i64) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    SessionStart,
    SessionEnd,
    ReservationCreated,
    ReservationConfirmed,
    ReservationCancelled,
    ReservationCompleted,
    ErrorReported,
    ErrorResolved,
    MaintenanceStarted,
    MaintenanceCompleted,
    ProfileUpdated,
    PasswordChanged,
    RoleChanged,
}

/// Filters for the admin activity listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityFilter {
    pub user_id: Option<i64>,
    pub machine_id: Option<i64>,
    pub action_type: Option<ActivityType>,
    pub since: Option<DateTime<Utc>>,
}

/// Row of the operational `logs` table shown in the admin panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct OperationLog {
    pub id: i64,
    pub machine_id: Option<i64>,
    pub user_id: Option<i64>,
    pub action: LogAction,
    #[schema(value_type = Option<Object>)]
    pub details: Option<Json<serde_json::Value>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LogAction {
    MachineStarted,
    SessionExpired,
    SessionFinished,
    SessionCancelled,
    StatusChanged,
    ManualOverride,
    ErrorReported,
    ErrorResolved,
    MaintenanceStarted,
    MaintenanceCompleted,
}
