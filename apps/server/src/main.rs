use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use cleancycle_auth::password::hash_secret;
use cleancycle_config::load as load_config;
use cleancycle_database::{MachineType, NewMachine, NewRoom, NewUser, User, UserRepository, UserRole};
use cleancycle_gateway::{build_router, AppState};
use cleancycle_runtime::{shutdown_signal, spawn_sweeper, telemetry, BackendServices};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
#[command(name = "cleancycle-backend")]
#[command(about = "CleanCycle laundry backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server and the background sweeper (default)
    Serve,
    /// Run one expiry sweep and exit
    Sweep,
    /// Create an admin account and a sample laundry room
    Seed {
        #[arg(long, default_value = "admin@cleancycle.local")]
        email: String,
        #[arg(long)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing().context("failed to initialise tracing")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server().await,
        Commands::Sweep => run_sweep().await,
        Commands::Seed { email, password } => seed(&email, &password).await,
    }
}

async fn initialise() -> anyhow::Result<(cleancycle_config::AppConfig, BackendServices)> {
    let config = load_config().context("failed to load configuration")?;
    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;
    Ok((config, services))
}

async fn run_server() -> anyhow::Result<()> {
    info!("starting CleanCycle backend");
    let (config, services) = initialise().await?;

    let sweeper = spawn_sweeper(
        services.laundry.sweep.clone(),
        Duration::from_secs(config.sweep.interval_seconds),
        shutdown_signal(),
    );

    let state = AppState::new(
        services.db_pool.clone(),
        services.authenticator.clone(),
        services.laundry.clone(),
        config.locale.clone(),
    );
    let app = build_router(state);

    let address = format!("{}:{}", config.http.address, config.http.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind http listener on {address}"))?;

    info!(%address, public_url = ?config.http.public_url, "http server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server error")?;

    if let Some(sweeper) = sweeper {
        sweeper.await.context("sweeper task panicked")?;
    }

    info!("backend shut down");
    Ok(())
}

async fn run_sweep() -> anyhow::Result<()> {
    let (_, services) = initialise().await?;
    let report = services
        .laundry
        .sweep
        .run()
        .await
        .context("expiry sweep failed")?;

    println!("Sweep finished:");
    println!("- {} sessions expired", report.expired_sessions);
    println!("- {} reminders sent", report.reminders_sent);
    println!("- {} reservations completed", report.reservations_completed);
    println!("- {} failures", report.failures);

    let purged = services
        .authenticator
        .purge_expired_sessions()
        .await
        .context("failed to purge expired tokens")?;
    println!("- {} expired tokens removed", purged);
    Ok(())
}

async fn seed(email: &str, password: &str) -> anyhow::Result<()> {
    info!("seeding database");
    let (_, services) = initialise().await?;

    let admin = seed_admin(&services, email, password).await?;
    let machines = &services.laundry.machines;

    let rooms = machines.list_rooms().await.context("failed to list rooms")?;
    if rooms.iter().any(|room| room.name == "Main Laundry Room") {
        println!("Sample room already exists, skipping");
        return Ok(());
    }

    let room = machines
        .create_room(
            &admin,
            &NewRoom {
                name: "Main Laundry Room".to_string(),
                description: Some("Ground floor, next to the bike storage".to_string()),
            },
        )
        .await
        .context("failed to create room")?;

    let layout = [
        ("Washer 1", MachineType::Washer, 60, 8.0),
        ("Washer 2", MachineType::Washer, 60, 8.0),
        ("Washer 3", MachineType::Washer, 45, 6.0),
        ("Dryer 1", MachineType::Dryer, 90, 8.0),
        ("Dryer 2", MachineType::Dryer, 90, 8.0),
    ];
    for (name, machine_type, duration, capacity) in layout {
        machines
            .create_machine(
                &admin,
                &NewMachine {
                    room_id: room.id,
                    name: name.to_string(),
                    machine_type,
                    default_duration: Some(duration),
                    capacity_kg: Some(capacity),
                },
            )
            .await
            .with_context(|| format!("failed to create machine {name}"))?;
    }

    println!("Database seeded:");
    println!("- admin account {}", admin.email);
    println!("- room \"{}\" with {} machines", room.name, layout.len());
    Ok(())
}

async fn seed_admin(services: &BackendServices, email: &str, password: &str) -> anyhow::Result<User> {
    let users = UserRepository::new(services.db_pool.clone());
    if let Some(existing) = users.find_by_email(email).await? {
        println!("Admin account {} already exists", existing.email);
        return Ok(existing);
    }

    let now = Utc::now();
    let password_hash = hash_secret(password)
        .map_err(|error| anyhow::anyhow!("failed to hash password: {error}"))?;
    let user = users
        .create_with_password(
            &NewUser {
                email: email.to_string(),
                username: "admin".to_string(),
                first_name: "Laundry".to_string(),
                last_name: "Admin".to_string(),
                phone: None,
                apartment_number: None,
                room_id: None,
            },
            &password_hash,
            "",
            now,
            now,
        )
        .await
        .context("failed to create admin account")?;
    users.mark_verified(user.id, now).await?;
    Ok(users.update_role(user.id, UserRole::Admin, now).await?)
}
