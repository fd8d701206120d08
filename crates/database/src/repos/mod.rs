//! Repository layer. Each repository owns a pool handle; multi-table state
//! transitions run inside a single transaction in the owning repository.

pub mod activity_repository;
pub mod auth_session_repository;
pub mod laundry_session_repository;
pub mod machine_error_repository;
pub mod machine_repository;
pub mod maintenance_repository;
pub mod notification_repository;
pub mod preferences_repository;
pub mod reservation_repository;
pub mod room_repository;
pub mod user_repository;

pub use activity_repository::ActivityRepository;
pub use auth_session_repository::AuthSessionRepository;
pub use laundry_session_repository::LaundrySessionRepository;
pub use machine_error_repository::MachineErrorRepository;
pub use machine_repository::MachineRepository;
pub use maintenance_repository::MaintenanceRepository;
pub use notification_repository::NotificationRepository;
pub use preferences_repository::PreferencesRepository;
pub use reservation_repository::ReservationRepository;
pub use room_repository::RoomRepository;
pub use user_repository::UserRepository;
