use chrono::{Duration, Utc};
use cleancycle_database::{
    LaundrySessionRepository, MachineRepository, RoomRepository, User, UserRepository,
};
use sqlx::SqlitePool;

use crate::stats::{self, MachineUsageStats, StatusBreakdown, UsageStats};
use crate::types::{DashboardStats, LaundryError, LaundryResult};

pub const DEFAULT_STATS_DAYS: i64 = 30;
const MAX_STATS_DAYS: i64 = 365;

pub struct StatisticsService {
    sessions: LaundrySessionRepository,
    machines: MachineRepository,
    rooms: RoomRepository,
    users: UserRepository,
}

impl StatisticsService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            sessions: LaundrySessionRepository::new(pool.clone()),
            machines: MachineRepository::new(pool.clone()),
            rooms: RoomRepository::new(pool.clone()),
            users: UserRepository::new(pool),
        }
    }

    pub async fn user_usage(&self, user: &User, days: Option<i64>) -> LaundryResult<UsageStats> {
        let days = window(days);
        let since = Utc::now() - Duration::days(days);
        let sessions = self.sessions.finished_for_user(user.id, Some(since)).await?;
        Ok(stats::user_usage(&sessions))
    }

    pub async fn machine_usage(
        &self,
        machine_id: i64,
        days: Option<i64>,
    ) -> LaundryResult<MachineUsageStats> {
        if self.machines.find_by_id(machine_id).await?.is_none() {
            return Err(LaundryError::not_found("machine", machine_id));
        }
        let days = window(days);
        let since = Utc::now() - Duration::days(days);
        let sessions = self
            .sessions
            .finished_for_machine(machine_id, Some(since))
            .await?;
        Ok(stats::machine_usage(&sessions, days))
    }

    pub async fn room_stats(&self, room_id: i64) -> LaundryResult<StatusBreakdown> {
        if self.rooms.find_by_id(room_id).await?.is_none() {
            return Err(LaundryError::not_found("room", room_id));
        }
        let counts = self.machines.status_counts(Some(room_id)).await?;
        Ok(StatusBreakdown::from_counts(&counts))
    }

    /// Machine status counts across all rooms plus user and session totals.
    pub async fn dashboard(&self) -> LaundryResult<DashboardStats> {
        let counts = self.machines.status_counts(None).await?;
        Ok(DashboardStats {
            machines: StatusBreakdown::from_counts(&counts),
            total_users: self.users.count().await?,
            active_sessions: self.sessions.count_active().await?,
        })
    }
}

fn window(days: Option<i64>) -> i64 {
    days.unwrap_or(DEFAULT_STATS_DAYS).clamp(1, MAX_STATS_DAYS)
}
