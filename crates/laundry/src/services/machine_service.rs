//! Machine grid, staff overrides, faults and maintenance.

use chrono::{DateTime, Utc};
use cleancycle_database::{
    DatabaseError, ErrorSeverity, Machine, MachineErrorRecord, MachineErrorRepository,
    MachineRepository, MachineType, MaintenanceRecord, MaintenanceRepository, NewMachine,
    NewMachineError, NewMaintenance, NewRoom, NotificationType, Page, Room, RoomRepository,
    StatusOverride, User,
};
use cleancycle_mail::SharedMailer;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::schedule::TimeRange;
use crate::services::NotificationService;
use crate::types::{
    LaundryError, LaundryResult, MachineDetail, ReportErrorRequest, StartMaintenanceRequest,
    StatusOverrideRequest,
};
use crate::utils::PermissionChecker;

/// Default number of maintenance records returned.
pub const MAINTENANCE_HISTORY_LIMIT: i64 = 10;

pub struct MachineService {
    machines: MachineRepository,
    rooms: RoomRepository,
    errors: MachineErrorRepository,
    maintenance: MaintenanceRepository,
    notifications: NotificationService,
}

impl MachineService {
    pub fn new(pool: SqlitePool, mailer: SharedMailer) -> Self {
        Self {
            machines: MachineRepository::new(pool.clone()),
            rooms: RoomRepository::new(pool.clone()),
            errors: MachineErrorRepository::new(pool.clone()),
            maintenance: MaintenanceRepository::new(pool.clone()),
            notifications: NotificationService::new(pool, mailer),
        }
    }

    pub async fn list_rooms(&self) -> LaundryResult<Vec<Room>> {
        Ok(self.rooms.list().await?)
    }

    pub async fn room(&self, room_id: i64) -> LaundryResult<Room> {
        self.rooms
            .find_by_id(room_id)
            .await?
            .ok_or_else(|| LaundryError::not_found("room", room_id))
    }

    /// Ordered by room, then name.
    pub async fn list_all(&self) -> LaundryResult<Vec<Machine>> {
        Ok(self.machines.list_all().await?)
    }

    /// Ordered by type, then name.
    pub async fn list_by_room(&self, room_id: i64) -> LaundryResult<Vec<Machine>> {
        self.room(room_id).await?;
        Ok(self.machines.list_by_room(room_id).await?)
    }

    pub async fn get(&self, machine_id: i64) -> LaundryResult<Machine> {
        self.machines
            .find_by_id(machine_id)
            .await?
            .ok_or_else(|| LaundryError::not_found("machine", machine_id))
    }

    pub async fn get_with_errors(&self, machine_id: i64) -> LaundryResult<MachineDetail> {
        let machine = self.get(machine_id).await?;
        let unresolved_errors = self.errors.unresolved_for_machine(machine_id).await?;
        Ok(MachineDetail {
            machine,
            unresolved_errors,
        })
    }

    pub async fn maintenance_history(
        &self,
        machine_id: i64,
        limit: Option<i64>,
    ) -> LaundryResult<Vec<MaintenanceRecord>> {
        self.get(machine_id).await?;
        let page = Page::new(Some(limit.unwrap_or(MAINTENANCE_HISTORY_LIMIT)), None);
        Ok(self.maintenance.history(machine_id, page).await?)
    }

    /// Free machines in a room with no confirmed reservation overlapping the slot.
    pub async fn available_for_slot(
        &self,
        room_id: i64,
        machine_type: Option<MachineType>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> LaundryResult<Vec<Machine>> {
        let range = TimeRange::new(start, end)?;
        Ok(self
            .machines
            .available_for_slot(room_id, machine_type, range.start(), range.end())
            .await?)
    }

    pub async fn override_status(
        &self,
        actor: &User,
        machine_id: i64,
        request: &StatusOverrideRequest,
    ) -> LaundryResult<StatusOverride> {
        PermissionChecker::require_staff(actor)?;
        let result = self
            .machines
            .override_status(machine_id, request.status, actor.id, Utc::now())
            .await
            .map_err(|err| match err {
                DatabaseError::NotFound(_) => LaundryError::not_found("machine", machine_id),
                other => other.into(),
            })?;

        info!(
            machine_id,
            from = %result.previous,
            to = %result.machine.status,
            closed_sessions = result.closed_sessions.len(),
            actor = %actor.public_id,
            "machine status overridden"
        );
        Ok(result)
    }

    /// Record a fault. A critical fault marks the machine broken and tells
    /// every user in-app.
    pub async fn report_error(
        &self,
        reporter: &User,
        machine_id: i64,
        request: &ReportErrorRequest,
    ) -> LaundryResult<MachineErrorRecord> {
        let code = request.error_code.trim();
        let message = request.error_message.trim();
        if code.is_empty() || message.is_empty() {
            return Err(LaundryError::validation("error code and message are required"));
        }

        let machine = self.get(machine_id).await?;
        let record = self
            .errors
            .report(
                &NewMachineError {
                    machine_id,
                    error_code: code.to_string(),
                    error_message: message.to_string(),
                    severity: request.severity,
                },
                Some(reporter.id),
                Utc::now(),
            )
            .await?;

        warn!(
            machine_id,
            error_id = record.id,
            severity = request.severity.as_str(),
            "machine error reported"
        );

        if request.severity == ErrorSeverity::Critical {
            let notice = format!("{} has an error: {}", machine.name, message);
            self.notifications
                .broadcast_in_app(NotificationType::System, &notice)
                .await?;
        }

        Ok(record)
    }

    pub async fn resolve_error(
        &self,
        actor: &User,
        error_id: i64,
    ) -> LaundryResult<MachineErrorRecord> {
        PermissionChecker::require_staff(actor)?;
        if self.errors.find_by_id(error_id).await?.is_none() {
            return Err(LaundryError::not_found("machine error", error_id));
        }
        self.errors
            .resolve(error_id, Some(actor.id), Utc::now())
            .await?
            .ok_or_else(|| LaundryError::Conflict {
                message: format!("machine error {error_id} is already resolved"),
            })
    }

    pub async fn start_maintenance(
        &self,
        actor: &User,
        machine_id: i64,
        request: &StartMaintenanceRequest,
    ) -> LaundryResult<MaintenanceRecord> {
        PermissionChecker::require_staff(actor)?;
        if request.description.trim().is_empty() {
            return Err(LaundryError::validation("maintenance description is required"));
        }

        let record = self
            .maintenance
            .start(
                &NewMaintenance {
                    machine_id,
                    maintenance_type: request.maintenance_type,
                    description: request.description.trim().to_string(),
                    performed_by: Some(actor.id),
                    notes: request.notes.clone(),
                },
                Utc::now(),
            )
            .await
            .map_err(|err| match err {
                DatabaseError::Conflict(_) => LaundryError::MachineUnavailable { machine_id },
                DatabaseError::NotFound(_) => LaundryError::not_found("machine", machine_id),
                other => other.into(),
            })?;

        info!(machine_id, maintenance_id = record.id, "maintenance started");
        Ok(record)
    }

    pub async fn complete_maintenance(
        &self,
        actor: &User,
        maintenance_id: i64,
        notes: Option<&str>,
    ) -> LaundryResult<MaintenanceRecord> {
        PermissionChecker::require_staff(actor)?;
        if self.maintenance.find_by_id(maintenance_id).await?.is_none() {
            return Err(LaundryError::not_found("maintenance", maintenance_id));
        }
        let record = self
            .maintenance
            .complete(maintenance_id, notes, Some(actor.id), Utc::now())
            .await?
            .ok_or_else(|| LaundryError::Conflict {
                message: format!("maintenance {maintenance_id} is already complete"),
            })?;

        info!(maintenance_id, machine_id = record.machine_id, "maintenance completed");
        Ok(record)
    }

    pub async fn create_room(&self, actor: &User, room: &NewRoom) -> LaundryResult<Room> {
        PermissionChecker::require_admin(actor)?;
        Ok(self.rooms.create(room, Utc::now()).await?)
    }

    pub async fn create_machine(&self, actor: &User, machine: &NewMachine) -> LaundryResult<Machine> {
        PermissionChecker::require_admin(actor)?;
        self.room(machine.room_id).await?;
        Ok(self.machines.create(machine, Utc::now()).await?)
    }
}
