//! Row types for every table, plus the request payloads repositories accept.

pub mod activity;
pub mod auth_session;
pub mod laundry_session;
pub mod machine;
pub mod machine_error;
pub mod maintenance;
pub mod notification;
pub mod preferences;
pub mod reservation;
pub mod room;
pub mod user;

pub use activity::{ActivityFilter, ActivityLog, ActivityType, LogAction, NewActivity, OperationLog};
pub use auth_session::AuthSession;
pub use laundry_session::{LaundrySession, SessionOutcome, SessionStatus};
pub use machine::{Machine, MachineStatus, MachineType, NewMachine, StatusCount};
pub use machine_error::{ErrorSeverity, MachineErrorRecord, NewMachineError};
pub use maintenance::{MaintenanceRecord, MaintenanceType, NewMaintenance};
pub use notification::{
    DeliveryStatus, Notification, NotificationChannel, NotificationLog, NotificationType,
};
pub use preferences::{PreferencesUpdate, UserPreferences};
pub use reservation::{NewReservation, Reservation, ReservationStatus};
pub use room::{NewRoom, Room};
pub use user::{NewUser, ProfileUpdate, User, UserRole};
