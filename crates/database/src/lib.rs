//! CleanCycle Database Crate
//!
//! Connection management, migrations, row types and repositories for the
//! laundry backend. State transitions that several writers can race on
//! (starting a machine, closing a session, confirming a reservation) are
//! conditional statements inside a single transaction.

use cleancycle_config::DatabaseConfig;
use sqlx::SqlitePool;

pub mod connection;
pub mod entities;
pub mod migrations;
pub mod repos;
pub mod timestamp;
pub mod types;

pub use connection::{prepare_database, DatabaseConnection};
pub use migrations::{run_migrations, MIGRATOR};

pub use repos::{
    ActivityRepository, AuthSessionRepository, LaundrySessionRepository, MachineErrorRepository,
    MachineRepository, MaintenanceRepository, NotificationRepository, PreferencesRepository,
    ReservationRepository, RoomRepository, UserRepository,
};
pub use repos::laundry_session_repository::ClosedSession;
pub use repos::machine_repository::StatusOverride;

pub use entities::*;

pub use types::{errors::DatabaseError, DatabaseResult, Page};

/// Re-export commonly used types for convenience
pub use sqlx::Pool;

/// Initialize the database with migrations
pub async fn initialize_database(config: &DatabaseConfig) -> DatabaseResult<SqlitePool> {
    let pool = prepare_database(config)
        .await
        .map_err(|e| DatabaseError::ConnectionError(format!("{e:#}")))?;

    run_migrations(&pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(format!("{e:#}")))?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_database() -> (SqlitePool, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let config = DatabaseConfig {
            url: format!("sqlite://{}", db_path.display()),
            max_connections: 1,
        };

        let pool = initialize_database(&config).await.unwrap();
        (pool, temp_dir)
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let (pool, _temp_dir) = create_test_database().await;

        let result: (bool,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();

        assert!(result.0);
    }
}
