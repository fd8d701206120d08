//! # CleanCycle Laundry Crate
//!
//! Business logic for the laundry room: machines and their faults, laundry
//! sessions, reservations, notifications, user profiles, statistics and the
//! periodic expiry sweep.
//!
//! ## Architecture
//!
//! - **Services**: one per area, each built from a pool and holding its repositories
//! - **Schedule**: time windows and the overlap rule
//! - **Stats**: pure aggregation over finished sessions
//! - **Types**: request/response shapes and `LaundryError`
//! - **Utils**: role checks
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cleancycle_laundry::{LaundryServices, StartSessionRequest};
//!
//! let services = LaundryServices::new(pool, authenticator, mailer, locales);
//! let session = services.sessions.start(&user, machine_id, &StartSessionRequest::default()).await?;
//! ```

use std::sync::Arc;

use cleancycle_auth::Authenticator;
use cleancycle_mail::SharedMailer;
use sqlx::SqlitePool;

pub mod schedule;
pub mod services;
pub mod stats;
pub mod types;
pub mod utils;

pub use schedule::TimeRange;
pub use services::{
    ActivityService, MachineService, NotificationService, ReservationService, SessionService,
    StatisticsService, SweepService, UserService,
};
pub use stats::{LifetimeStats, MachineUsageStats, StatusBreakdown, UsageStats};
pub use types::*;
pub use utils::PermissionChecker;

/// Every service, shared behind `Arc`s so handlers can clone the set cheaply.
#[derive(Clone)]
pub struct LaundryServices {
    pub machines: Arc<MachineService>,
    pub sessions: Arc<SessionService>,
    pub reservations: Arc<ReservationService>,
    pub notifications: Arc<NotificationService>,
    pub users: Arc<UserService>,
    pub statistics: Arc<StatisticsService>,
    pub activity: Arc<ActivityService>,
    pub sweep: Arc<SweepService>,
}

impl LaundryServices {
    pub fn new(
        pool: SqlitePool,
        authenticator: Authenticator,
        mailer: SharedMailer,
        supported_locales: Vec<String>,
    ) -> Self {
        Self {
            machines: Arc::new(MachineService::new(pool.clone(), mailer.clone())),
            sessions: Arc::new(SessionService::new(pool.clone())),
            reservations: Arc::new(ReservationService::new(pool.clone())),
            notifications: Arc::new(NotificationService::new(pool.clone(), mailer.clone())),
            users: Arc::new(UserService::new(
                pool.clone(),
                authenticator,
                supported_locales,
            )),
            statistics: Arc::new(StatisticsService::new(pool.clone())),
            activity: Arc::new(ActivityService::new(pool.clone())),
            sweep: Arc::new(SweepService::new(pool, mailer)),
        }
    }
}
