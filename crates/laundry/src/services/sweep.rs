//! Periodic housekeeping: expire finished cycles, send reservation
//! reminders and complete elapsed reservations.
//!
//! Every step is a conditional write, so overlapping sweeps (or a sweep
//! racing a manual finish) act on each row once.

use chrono::{DateTime, Duration, Utc};
use cleancycle_database::{
    LaundrySession, LaundrySessionRepository, MachineRepository, NotificationType,
    PreferencesRepository, Reservation, ReservationRepository, SessionOutcome,
};
use cleancycle_mail::SharedMailer;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::services::NotificationService;
use crate::types::{LaundryResult, SweepReport, MAX_REMINDER_MINUTES};

pub struct SweepService {
    sessions: LaundrySessionRepository,
    machines: MachineRepository,
    reservations: ReservationRepository,
    preferences: PreferencesRepository,
    notifications: NotificationService,
}

impl SweepService {
    pub fn new(pool: SqlitePool, mailer: SharedMailer) -> Self {
        Self {
            sessions: LaundrySessionRepository::new(pool.clone()),
            machines: MachineRepository::new(pool.clone()),
            reservations: ReservationRepository::new(pool.clone()),
            preferences: PreferencesRepository::new(pool.clone()),
            notifications: NotificationService::new(pool, mailer),
        }
    }

    pub async fn run(&self) -> LaundryResult<SweepReport> {
        self.run_at(Utc::now()).await
    }

    /// One sweep as of `now`. Per-row failures are logged and counted; only
    /// failing to list candidates aborts the sweep.
    pub async fn run_at(&self, now: DateTime<Utc>) -> LaundryResult<SweepReport> {
        let mut report = SweepReport::default();

        for session in self.sessions.expired(now).await? {
            match self.expire(&session, now).await {
                Ok(true) => report.expired_sessions += 1,
                Ok(false) => debug!(session_id = session.id, "session already closed"),
                Err(err) => {
                    warn!(session_id = session.id, error = %err, "failed to expire session");
                    report.failures += 1;
                }
            }
        }

        let horizon = now + Duration::minutes(MAX_REMINDER_MINUTES);
        for reservation in self
            .reservations
            .unreminded_starting_before(now, horizon)
            .await?
        {
            match self.remind(&reservation, now).await {
                Ok(true) => report.reminders_sent += 1,
                Ok(false) => {}
                Err(err) => {
                    warn!(reservation_id = reservation.id, error = %err, "failed to send reminder");
                    report.failures += 1;
                }
            }
        }

        report.reservations_completed = self.reservations.complete_elapsed(now).await?.len();

        if report != SweepReport::default() {
            info!(
                expired = report.expired_sessions,
                reminders = report.reminders_sent,
                completed = report.reservations_completed,
                failures = report.failures,
                "sweep finished"
            );
        }
        Ok(report)
    }

    async fn expire(&self, session: &LaundrySession, now: DateTime<Utc>) -> LaundryResult<bool> {
        let machine_name = self.machine_name(session.machine_id).await?;
        let notice = format!(
            "The {machine_name} cycle has finished. Please collect your laundry."
        );

        let Some(closed) = self
            .sessions
            .close(session.id, &SessionOutcome::Expired { notice }, now)
            .await?
        else {
            return Ok(false);
        };

        if let Some(notification_id) = closed.notification_id {
            if let Err(err) = self.notifications.deliver_stored(notification_id).await {
                warn!(session_id = session.id, error = %err, "expired notice delivery failed");
            }
        }
        Ok(true)
    }

    /// `false` when the owner's lead time has not been reached yet, reminders are
    /// off, or another sweep already stamped the reservation.
    async fn remind(&self, reservation: &Reservation, now: DateTime<Utc>) -> LaundryResult<bool> {
        let preferences = self
            .preferences
            .get_or_create(reservation.user_id, now)
            .await?;
        let lead = preferences.notification_reminder_minutes;
        if lead <= 0 || reservation.start_time > now + Duration::minutes(lead) {
            return Ok(false);
        }

        if !self.reservations.mark_reminded(reservation.id, now).await? {
            return Ok(false);
        }

        let machine_name = self.machine_name(reservation.machine_id).await?;
        let minutes = (reservation.start_time - now).num_minutes().max(1);
        let message = format!("Your reservation for {machine_name} starts in {minutes} minutes.");
        self.notifications
            .notify(reservation.user_id, NotificationType::Reminder, &message)
            .await?;
        Ok(true)
    }

    async fn machine_name(&self, machine_id: i64) -> LaundryResult<String> {
        Ok(self
            .machines
            .find_by_id(machine_id)
            .await?
            .map(|machine| machine.name)
            .unwrap_or_else(|| format!("machine {machine_id}")))
    }
}
