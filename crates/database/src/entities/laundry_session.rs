use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One use of a machine, from start until it is finished, cancelled or
/// swept after `end_time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LaundrySession {
    pub id: i64,
    pub user_id: i64,
    pub machine_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub actual_end: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
}

impl LaundrySession {
    /// Minutes the machine was actually in use, falling back to the planned end.
    pub fn duration_minutes(&self) -> i64 {
        let end = self.actual_end.unwrap_or(self.end_time);
        (end - self.start_time).num_minutes().max(0)
    }

    pub fn planned_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes().max(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Finished,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Finished => "finished",
            SessionStatus::Cancelled => "cancelled",
        }
    }
}

/// How an active session is being closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Owner or staff ended the cycle.
    Finished { actor_id: i64 },
    /// Owner or staff aborted the cycle.
    Cancelled { actor_id: i64 },
    /// The sweep found the session past its end time. The notice is stored as
    /// an `expired` notification for the owner.
    Expired { notice: String },
    /// Staff forced the machine back to free.
    Overridden { actor_id: i64 },
}

impl SessionOutcome {
    pub fn status(&self) -> SessionStatus {
        match self {
            SessionOutcome::Cancelled { .. } => SessionStatus::Cancelled,
            _ => SessionStatus::Finished,
        }
    }

    pub fn actor_id(&self) -> Option<i64> {
        match self {
            SessionOutcome::Finished { actor_id }
            | SessionOutcome::Cancelled { actor_id }
            | SessionOutcome::Overridden { actor_id } => Some(*actor_id),
            SessionOutcome::Expired { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn session(actual_end: Option<DateTime<Utc>>) -> LaundrySession {
        let start = Utc.with_ymd_and_hms(2025, 1, 6, 8, 0, 0).unwrap();
        LaundrySession {
            id: 1,
            user_id: 1,
            machine_id: 1,
            start_time: start,
            end_time: start + Duration::minutes(60),
            actual_end,
            status: SessionStatus::Finished,
            created_at: start,
        }
    }

    #[test]
    fn duration_prefers_actual_end() {
        let early = session(Some(Utc.with_ymd_and_hms(2025, 1, 6, 8, 25, 0).unwrap()));
        assert_eq!(early.duration_minutes(), 25);
        assert_eq!(early.planned_minutes(), 60);

        assert_eq!(session(None).duration_minutes(), 60);
    }

    #[test]
    fn outcome_maps_to_status() {
        assert_eq!(
            SessionOutcome::Cancelled { actor_id: 3 }.status(),
            SessionStatus::Cancelled
        );
        let expired = SessionOutcome::Expired {
            notice: "done".to_string(),
        };
        assert_eq!(expired.status(), SessionStatus::Finished);
        assert_eq!(expired.actor_id(), None);
    }
}
