//! Request payloads accepted by the laundry services.

use chrono::{DateTime, Utc};
use cleancycle_database::{ErrorSeverity, MachineStatus, MaintenanceType, UserRole};
use serde::Deserialize;
use utoipa::ToSchema;

/// Longest cycle a resident may start, in minutes.
pub const MAX_SESSION_MINUTES: i64 = 240;

/// Upper bound for `notification_reminder_minutes`.
pub const MAX_REMINDER_MINUTES: i64 = 1440;

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct StartSessionRequest {
    /// Defaults to the machine's `default_duration`.
    pub duration_minutes: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateReservationRequest {
    pub machine_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ReportErrorRequest {
    pub error_code: String,
    pub error_message: String,
    #[serde(default = "default_severity")]
    pub severity: ErrorSeverity,
}

fn default_severity() -> ErrorSeverity {
    ErrorSeverity::Warning
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StartMaintenanceRequest {
    pub maintenance_type: MaintenanceType,
    pub description: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CompleteMaintenanceRequest {
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StatusOverrideRequest {
    pub status: MachineStatus,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RoleChangeRequest {
    pub role: UserRole,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}
