//! Response shapes returned by the laundry services.

use cleancycle_database::{Machine, MachineErrorRecord, Notification};
use serde::Serialize;
use utoipa::ToSchema;

use crate::stats::StatusBreakdown;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MachineDetail {
    #[serde(flatten)]
    pub machine: Machine,
    pub unresolved_errors: Vec<MachineErrorRecord>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NotificationList {
    pub notifications: Vec<Notification>,
    pub unread_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DashboardStats {
    #[serde(flatten)]
    pub machines: StatusBreakdown,
    pub total_users: i64,
    pub active_sessions: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Availability {
    pub available: bool,
}

/// Outcome of one expiry sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct SweepReport {
    pub expired_sessions: usize,
    pub reminders_sent: usize,
    pub reservations_completed: usize,
    /// Items that failed and were left for the next sweep.
    pub failures: usize,
}
