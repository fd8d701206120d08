use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use cleancycle_auth::Authenticator;
use cleancycle_config::AppConfig;
use cleancycle_database::initialize_database;
use cleancycle_laundry::{LaundryServices, SweepService};
use cleancycle_mail::{build_mailer, SharedMailer};
use sqlx::SqlitePool;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

pub mod telemetry {
    use anyhow::Result;
    use tracing::Level;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    /// `RUST_LOG` when set, `info` otherwise.
    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_max_level(Level::DEBUG)
            .with_env_filter(env_filter)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

#[derive(Clone)]
pub struct BackendServices {
    pub db_pool: SqlitePool,
    pub mailer: SharedMailer,
    pub authenticator: Authenticator,
    pub laundry: LaundryServices,
}

impl BackendServices {
    pub async fn initialise(config: &AppConfig) -> Result<Self> {
        let db_pool = initialize_database(&config.database)
            .await
            .context("failed to initialise database")?;
        let mailer = build_mailer(&config.mail).context("failed to configure mailer")?;
        Ok(Self::with_mailer(db_pool, mailer, config))
    }

    /// Wire the services around an existing pool and mailer.
    pub fn with_mailer(db_pool: SqlitePool, mailer: SharedMailer, config: &AppConfig) -> Self {
        let authenticator = Authenticator::new(db_pool.clone(), &config.auth, mailer.clone());
        let laundry = LaundryServices::new(
            db_pool.clone(),
            authenticator.clone(),
            mailer.clone(),
            config.locale.supported.clone(),
        );

        debug!(
            default_locale = %config.locale.default,
            sweep_interval_seconds = config.sweep.interval_seconds,
            "backend services ready"
        );

        Self {
            db_pool,
            mailer,
            authenticator,
            laundry,
        }
    }
}

/// Run the expiry sweep every `interval` until `shutdown` resolves.
/// A zero interval disables the sweeper and returns `None`.
pub fn spawn_sweeper<F>(
    sweep: Arc<SweepService>,
    interval: Duration,
    shutdown: F,
) -> Option<JoinHandle<()>>
where
    F: Future<Output = ()> + Send + 'static,
{
    if interval.is_zero() {
        info!("background sweeper disabled");
        return None;
    }

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(interval_seconds = interval.as_secs(), "background sweeper started");
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    if let Err(error) = sweep.run().await {
                        warn!(%error, "expiry sweep failed");
                    }
                }
            }
        }
        info!("background sweeper stopped");
    }))
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
