use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct MaintenanceRecord {
    pub id: i64,
    pub machine_id: i64,
    pub maintenance_type: MaintenanceType,
    pub description: String,
    pub performed_by: Option<i64>,
    pub start_time: DateTime<Utc>,
    /// `None` while the maintenance window is still open.
    pub end_time: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMaintenance {
    pub machine_id: i64,
    pub maintenance_type: MaintenanceType,
    pub description: String,
    pub performed_by: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MaintenanceType {
    Preventive,
    Corrective,
    Inspection,
}
