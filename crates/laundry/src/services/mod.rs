pub mod activity_service;
pub mod machine_service;
pub mod notification_service;
pub mod reservation_service;
pub mod session_service;
pub mod statistics_service;
pub mod sweep;
pub mod user_service;

pub use activity_service::ActivityService;
pub use machine_service::MachineService;
pub use notification_service::NotificationService;
pub use reservation_service::ReservationService;
pub use session_service::SessionService;
pub use statistics_service::StatisticsService;
pub use sweep::SweepService;
pub use user_service::UserService;
