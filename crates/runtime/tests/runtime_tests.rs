use std::{path::Path, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use chrono::Utc;
use cleancycle_config::AppConfig;
use cleancycle_database::{
    timestamp, MachineStatus, MachineType, NewMachine, NewRoom, NewUser, UserRepository, UserRole,
};
use cleancycle_laundry::StartSessionRequest;
use cleancycle_mail::MemoryMailer;
use cleancycle_runtime::{spawn_sweeper, BackendServices};
use tempfile::TempDir;

fn sqlite_url(path: &Path) -> String {
    format!("sqlite://{}", path.to_string_lossy())
}

fn build_config(database_url: String, max_connections: u32) -> AppConfig {
    let mut config = AppConfig::default();
    config.database.url = database_url;
    config.database.max_connections = max_connections;
    config
}

async fn initialise(config: &AppConfig) -> Result<BackendServices> {
    BackendServices::initialise(config)
        .await
        .context("failed to initialise backend services")
}

#[tokio::test(flavor = "multi_thread")]
async fn initialise_runs_migrations() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("runtime/init.db");
    let config = build_config(sqlite_url(&db_path), 4);

    let services = initialise(&config).await?;
    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN ('users', 'machines', 'reservations') ORDER BY name",
    )
    .fetch_all(&services.db_pool)
    .await?;

    assert_eq!(tables, vec!["machines", "reservations", "users"]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn prepare_database_creates_sqlite_directory_if_missing() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_dir = temp_dir.path().join("nested");
    let config = build_config(sqlite_url(&db_dir.join("prepared.db")), 2);

    assert!(!db_dir.exists());
    let _services = initialise(&config).await?;
    assert!(db_dir.exists(), "database directory should be created");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn pool_enforces_foreign_keys_and_connection_limit() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = build_config(sqlite_url(&temp_dir.path().join("pool.db")), 3);
    let services = initialise(&config).await?;

    let enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
        .fetch_one(&services.db_pool)
        .await?;
    assert_eq!(1, enabled, "foreign key enforcement must be enabled");
    assert_eq!(3, services.db_pool.options().get_max_connections());
    Ok(())
}

#[tokio::test]
async fn zero_interval_disables_the_sweeper() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = build_config(sqlite_url(&temp_dir.path().join("off.db")), 1);
    let services = initialise(&config).await?;

    let handle = spawn_sweeper(
        services.laundry.sweep.clone(),
        Duration::ZERO,
        std::future::pending(),
    );
    assert!(handle.is_none());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn sweeper_frees_overdue_machines_and_stops_on_shutdown() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = build_config(sqlite_url(&temp_dir.path().join("sweeper.db")), 2);
    let pool = cleancycle_database::initialize_database(&config.database).await?;
    let services = BackendServices::with_mailer(pool, Arc::new(MemoryMailer::new()), &config);

    let users = UserRepository::new(services.db_pool.clone());
    let now = Utc::now();
    let admin = users
        .create_with_password(
            &NewUser {
                email: "admin@example.com".to_string(),
                username: "admin".to_string(),
                first_name: "Ada".to_string(),
                last_name: "Admin".to_string(),
                phone: None,
                apartment_number: None,
                room_id: None,
            },
            "unused-hash",
            "unused-code",
            now,
            now,
        )
        .await?;
    let admin = users.update_role(admin.id, UserRole::Admin, now).await?;

    let machines = &services.laundry.machines;
    let room = machines
        .create_room(
            &admin,
            &NewRoom {
                name: "Laundry".to_string(),
                description: None,
            },
        )
        .await?;
    let machine = machines
        .create_machine(
            &admin,
            &NewMachine {
                room_id: room.id,
                name: "Dryer".to_string(),
                machine_type: MachineType::Dryer,
                default_duration: Some(30),
                capacity_kg: None,
            },
        )
        .await?;
    let session = services
        .laundry
        .sessions
        .start(&admin, machine.id, &StartSessionRequest::default())
        .await?;

    sqlx::query("UPDATE sessions SET end_time = ? WHERE id = ?")
        .bind(timestamp::format(now - chrono::Duration::minutes(5)))
        .bind(session.id)
        .execute(&services.db_pool)
        .await?;

    let handle = spawn_sweeper(
        services.laundry.sweep.clone(),
        Duration::from_millis(50),
        tokio::time::sleep(Duration::from_millis(400)),
    )
    .context("sweeper should be running")?;
    tokio::time::timeout(Duration::from_secs(5), handle).await??;

    assert_eq!(machines.get(machine.id).await?.status, MachineStatus::Free);
    Ok(())
}
