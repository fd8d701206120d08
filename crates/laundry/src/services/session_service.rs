//! Starting and closing laundry cycles.

use chrono::Utc;
use cleancycle_database::{
    DatabaseError, LaundrySession, LaundrySessionRepository, MachineRepository, Page,
    SessionOutcome, User,
};
use sqlx::SqlitePool;
use tracing::info;

use crate::types::{LaundryError, LaundryResult, StartSessionRequest, MAX_SESSION_MINUTES};
use crate::utils::PermissionChecker;

pub struct SessionService {
    sessions: LaundrySessionRepository,
    machines: MachineRepository,
}

impl SessionService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            sessions: LaundrySessionRepository::new(pool.clone()),
            machines: MachineRepository::new(pool),
        }
    }

    /// Claim a free machine for `user` and start the cycle.
    pub async fn start(
        &self,
        user: &User,
        machine_id: i64,
        request: &StartSessionRequest,
    ) -> LaundryResult<LaundrySession> {
        let machine = self
            .machines
            .find_by_id(machine_id)
            .await?
            .ok_or_else(|| LaundryError::not_found("machine", machine_id))?;

        let duration = request.duration_minutes.unwrap_or(machine.default_duration);
        if !(1..=MAX_SESSION_MINUTES).contains(&duration) {
            return Err(LaundryError::validation(format!(
                "duration must be between 1 and {MAX_SESSION_MINUTES} minutes"
            )));
        }

        let session = self
            .sessions
            .start(user.id, machine_id, duration, Utc::now())
            .await
            .map_err(|err| match err {
                DatabaseError::Conflict(_) => LaundryError::MachineUnavailable { machine_id },
                DatabaseError::NotFound(_) => LaundryError::not_found("machine", machine_id),
                other => other.into(),
            })?;

        info!(
            session_id = session.id,
            machine_id,
            user = %user.public_id,
            duration,
            "laundry session started"
        );
        Ok(session)
    }

    pub async fn finish(&self, user: &User, session_id: i64) -> LaundryResult<LaundrySession> {
        self.close(user, session_id, SessionOutcome::Finished { actor_id: user.id })
            .await
    }

    pub async fn cancel(&self, user: &User, session_id: i64) -> LaundryResult<LaundrySession> {
        self.close(user, session_id, SessionOutcome::Cancelled { actor_id: user.id })
            .await
    }

    async fn close(
        &self,
        user: &User,
        session_id: i64,
        outcome: SessionOutcome,
    ) -> LaundryResult<LaundrySession> {
        let session = self
            .sessions
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| LaundryError::not_found("session", session_id))?;
        PermissionChecker::require_owner_or_staff(user, session.user_id)?;

        let closed = self
            .sessions
            .close(session_id, &outcome, Utc::now())
            .await?
            .ok_or(LaundryError::SessionNotActive { session_id })?;

        info!(
            session_id,
            status = closed.session.status.as_str(),
            "laundry session closed"
        );
        Ok(closed.session)
    }

    pub async fn active(&self, user: &User) -> LaundryResult<Vec<LaundrySession>> {
        Ok(self.sessions.active_for_user(user.id).await?)
    }

    pub async fn history(&self, user: &User, limit: Option<i64>) -> LaundryResult<Vec<LaundrySession>> {
        Ok(self
            .sessions
            .history_for_user(user.id, Page::new(limit, None))
            .await?)
    }
}
