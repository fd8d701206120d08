//! Usage aggregation over finished laundry sessions.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use cleancycle_database::{LaundrySession, MachineStatus, StatusCount};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DailyCount {
    pub date: String,
    pub sessions: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct HourlyCount {
    pub hour: String,
    pub sessions: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct UsageStats {
    pub total_sessions: i64,
    pub total_minutes: i64,
    pub average_session_duration: f64,
    pub daily_data: Vec<DailyCount>,
    /// Sessions per machine id.
    pub machine_usage: BTreeMap<i64, i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MachineUsageStats {
    pub total_sessions: i64,
    pub total_minutes: i64,
    pub average_session_duration: f64,
    /// Percentage of the window the machine was running.
    pub utilization_rate: f64,
    pub daily_data: Vec<DailyCount>,
    pub hourly_data: Vec<HourlyCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LifetimeStats {
    pub total_sessions: i64,
    pub total_minutes: i64,
    pub this_month_sessions: i64,
    pub average_session_duration: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct StatusBreakdown {
    pub total_machines: i64,
    pub available_machines: i64,
    pub in_use_machines: i64,
    pub reserved_machines: i64,
    pub maintenance_machines: i64,
    pub broken_machines: i64,
}

impl StatusBreakdown {
    pub fn from_counts(counts: &[StatusCount]) -> Self {
        let mut breakdown = Self::default();
        for StatusCount { status, count } in counts {
            breakdown.total_machines += count;
            let slot = match status {
                MachineStatus::Free => &mut breakdown.available_machines,
                MachineStatus::Running => &mut breakdown.in_use_machines,
                MachineStatus::Booked => &mut breakdown.reserved_machines,
                MachineStatus::Maintenance => &mut breakdown.maintenance_machines,
                MachineStatus::Broken => &mut breakdown.broken_machines,
            };
            *slot += count;
        }
        breakdown
    }
}

fn total_minutes(sessions: &[LaundrySession]) -> i64 {
    sessions.iter().map(LaundrySession::duration_minutes).sum()
}

fn average(total: i64, count: i64) -> f64 {
    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}

fn daily(sessions: &[LaundrySession]) -> Vec<DailyCount> {
    let mut days: BTreeMap<String, i64> = BTreeMap::new();
    for session in sessions {
        *days
            .entry(session.start_time.format("%Y-%m-%d").to_string())
            .or_default() += 1;
    }
    days.into_iter()
        .map(|(date, sessions)| DailyCount { date, sessions })
        .collect()
}

pub fn user_usage(sessions: &[LaundrySession]) -> UsageStats {
    let total_sessions = sessions.len() as i64;
    let total_minutes = total_minutes(sessions);

    let mut machine_usage = BTreeMap::new();
    for session in sessions {
        *machine_usage.entry(session.machine_id).or_default() += 1;
    }

    UsageStats {
        total_sessions,
        total_minutes,
        average_session_duration: average(total_minutes, total_sessions),
        daily_data: daily(sessions),
        machine_usage,
    }
}

pub fn utilization_rate(total_minutes: i64, days: i64) -> f64 {
    if days <= 0 {
        return 0.0;
    }
    total_minutes as f64 / (days * 24 * 60) as f64 * 100.0
}

pub fn machine_usage(sessions: &[LaundrySession], days: i64) -> MachineUsageStats {
    let total_sessions = sessions.len() as i64;
    let total_minutes = total_minutes(sessions);

    let mut hours: BTreeMap<u32, i64> = BTreeMap::new();
    for session in sessions {
        *hours.entry(session.start_time.hour()).or_default() += 1;
    }

    MachineUsageStats {
        total_sessions,
        total_minutes,
        average_session_duration: average(total_minutes, total_sessions),
        utilization_rate: utilization_rate(total_minutes, days),
        daily_data: daily(sessions),
        hourly_data: hours
            .into_iter()
            .map(|(hour, sessions)| HourlyCount {
                hour: format!("{hour}:00"),
                sessions,
            })
            .collect(),
    }
}

/// First instant of `now`'s calendar month (UTC).
pub fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

pub fn lifetime(sessions: &[LaundrySession], now: DateTime<Utc>) -> LifetimeStats {
    let total_sessions = sessions.len() as i64;
    let total_minutes = total_minutes(sessions);
    let since = month_start(now);

    LifetimeStats {
        total_sessions,
        total_minutes,
        this_month_sessions: sessions.iter().filter(|s| s.start_time >= since).count() as i64,
        average_session_duration: average(total_minutes, total_sessions),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use cleancycle_database::SessionStatus;

    fn finished(id: i64, machine_id: i64, start: DateTime<Utc>, minutes: i64) -> LaundrySession {
        LaundrySession {
            id,
            user_id: 1,
            machine_id,
            start_time: start,
            end_time: start + Duration::minutes(minutes),
            actual_end: Some(start + Duration::minutes(minutes)),
            status: SessionStatus::Finished,
            created_at: start,
        }
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn user_usage_groups_by_day_and_machine() {
        let sessions = vec![
            finished(1, 10, at(12, 8), 60),
            finished(2, 11, at(12, 18), 30),
            finished(3, 10, at(14, 9), 45),
        ];

        let stats = user_usage(&sessions);
        assert_eq!(stats.total_sessions, 3);
        assert_eq!(stats.total_minutes, 135);
        assert!((stats.average_session_duration - 45.0).abs() < f64::EPSILON);
        assert_eq!(
            stats.daily_data,
            vec![
                DailyCount { date: "2025-05-12".into(), sessions: 2 },
                DailyCount { date: "2025-05-14".into(), sessions: 1 },
            ]
        );
        assert_eq!(stats.machine_usage.get(&10), Some(&2));
        assert_eq!(stats.machine_usage.get(&11), Some(&1));
    }

    #[test]
    fn empty_usage_has_zero_average() {
        let stats = user_usage(&[]);
        assert_eq!(stats.total_sessions, 0);
        assert_eq!(stats.average_session_duration, 0.0);
        assert!(stats.daily_data.is_empty());
    }

    #[test]
    fn machine_usage_reports_utilization_and_hours() {
        let sessions = vec![
            finished(1, 10, at(12, 8), 720),
            finished(2, 10, at(13, 8), 720),
            finished(3, 10, at(13, 20), 0),
        ];

        let stats = machine_usage(&sessions, 1);
        assert!((stats.utilization_rate - 100.0).abs() < 1e-9);
        assert_eq!(
            stats.hourly_data,
            vec![
                HourlyCount { hour: "8:00".into(), sessions: 2 },
                HourlyCount { hour: "20:00".into(), sessions: 1 },
            ]
        );
        assert_eq!(utilization_rate(720, 30), 720.0 / 43_200.0 * 100.0);
        assert_eq!(utilization_rate(10, 0), 0.0);
    }

    #[test]
    fn breakdown_sums_to_total() {
        let counts = vec![
            StatusCount { status: MachineStatus::Free, count: 3 },
            StatusCount { status: MachineStatus::Running, count: 2 },
            StatusCount { status: MachineStatus::Broken, count: 1 },
        ];
        let breakdown = StatusBreakdown::from_counts(&counts);
        assert_eq!(breakdown.total_machines, 6);
        assert_eq!(
            breakdown.available_machines
                + breakdown.in_use_machines
                + breakdown.reserved_machines
                + breakdown.maintenance_machines
                + breakdown.broken_machines,
            breakdown.total_machines
        );
    }

    #[test]
    fn lifetime_counts_current_month() {
        let now = at(20, 12);
        let sessions = vec![
            finished(1, 10, Utc.with_ymd_and_hms(2025, 4, 30, 23, 0, 0).unwrap(), 60),
            finished(2, 10, at(1, 0), 30),
            finished(3, 10, at(19, 7), 30),
        ];
        let stats = lifetime(&sessions, now);
        assert_eq!(stats.total_sessions, 3);
        assert_eq!(stats.this_month_sessions, 2);
        assert_eq!(stats.total_minutes, 120);
        assert_eq!(month_start(now), at(1, 0));
    }
}
