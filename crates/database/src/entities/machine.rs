//! Machine entity definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Machine {
    pub id: i64,
    pub room_id: i64,
    pub name: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub machine_type: MachineType,
    pub status: MachineStatus,
    /// Cycle length in minutes used when a session is started without one.
    pub default_duration: i64,
    pub capacity_kg: Option<f64>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub last_maintenance: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewMachine {
    pub room_id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub machine_type: MachineType,
    pub default_duration: Option<i64>,
    pub capacity_kg: Option<f64>,
}

impl NewMachine {
    pub const DEFAULT_DURATION_MINUTES: i64 = 60;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MachineType {
    Washer,
    Dryer,
}

impl MachineType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MachineType::Washer => "washer",
            MachineType::Dryer => "dryer",
        }
    }
}

impl std::str::FromStr for MachineType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "washer" => Ok(MachineType::Washer),
            "dryer" => Ok(MachineType::Dryer),
            other => Err(format!("unknown machine type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MachineStatus {
    Free,
    Running,
    Booked,
    Maintenance,
    Broken,
}

impl MachineStatus {
    pub const ALL: [MachineStatus; 5] = [
        MachineStatus::Free,
        MachineStatus::Running,
        MachineStatus::Booked,
        MachineStatus::Maintenance,
        MachineStatus::Broken,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MachineStatus::Free => "free",
            MachineStatus::Running => "running",
            MachineStatus::Booked => "booked",
            MachineStatus::Maintenance => "maintenance",
            MachineStatus::Broken => "broken",
        }
    }

    /// Whether a new laundry session may start on a machine in this state.
    pub fn accepts_session(&self) -> bool {
        matches!(self, MachineStatus::Free | MachineStatus::Booked)
    }
}

impl std::str::FromStr for MachineStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MachineStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown machine status: {s}"))
    }
}

impl std::fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row of a `GROUP BY status` count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct StatusCount {
    pub status: MachineStatus,
    pub count: i64,
}
