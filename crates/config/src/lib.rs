use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "cleancycle.toml",
    "config/cleancycle.toml",
    "crates/config/cleancycle.toml",
    "../cleancycle.toml",
    "../config/cleancycle.toml",
    "../crates/config/cleancycle.toml",
];

/// Locales the application ships message catalogs and routes for.
pub const SUPPORTED_LOCALES: &[&str] = &["en", "hu", "nl", "de", "fr", "it", "be", "bg", "sk"];

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
    #[serde(default)]
    pub locale: LocaleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub address: String,
    pub port: u16,
    /// Externally reachable origin, used for links in outgoing mail.
    pub public_url: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 7070,
            public_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://cleancycle.db".to_string(),
            max_connections: 10,
        }
    }
}

/// Authentication and email verification settings.
///
/// ```
/// use cleancycle_config::AuthConfig;
///
/// let auth = AuthConfig::default();
/// assert_eq!(auth.verification_code_ttl_seconds, 900);
/// assert_eq!(auth.verification_max_attempts, 5);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub session_ttl_seconds: u64,
    pub remember_me_ttl_seconds: u64,
    pub verification_code_ttl_seconds: u64,
    pub verification_max_attempts: u32,
    pub verification_resend_cooldown_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_seconds: 86_400,
            remember_me_ttl_seconds: 2_592_000,
            verification_code_ttl_seconds: 900,
            verification_max_attempts: 5,
            verification_resend_cooldown_seconds: 60,
        }
    }
}

/// SMTP relay used for transactional mail. When `enabled` is false the
/// backend keeps outgoing mail in memory and only logs it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub enabled: bool,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    pub from_address: String,
    pub from_name: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            smtp_user: None,
            smtp_password: None,
            from_address: "noreply.cleancycle@gmail.com".to_string(),
            from_name: "CleanCycle".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Seconds between expiry sweeps; `0` turns the background sweeper off.
    pub interval_seconds: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocaleConfig {
    pub default: String,
    pub supported: Vec<String>,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            default: "en".to_string(),
            supported: SUPPORTED_LOCALES.iter().map(|l| l.to_string()).collect(),
        }
    }
}

impl LocaleConfig {
    pub fn is_supported(&self, locale: &str) -> bool {
        self.supported.iter().any(|candidate| candidate == locale)
    }
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use cleancycle_config::load;
///
/// std::env::remove_var("CLEANCYCLE_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.http.address.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let mut builder = config::Config::builder()
        .set_default("http.address", defaults.http.address.clone())?
        .set_default("http.port", i64::from(defaults.http.port))?
        .set_default("database.url", defaults.database.url.clone())?
        .set_default(
            "database.max_connections",
            i64::from(defaults.database.max_connections),
        )?
        .set_default("locale.default", defaults.locale.default.clone())?;

    let environment_overrides = config::Environment::with_prefix("CLEANCYCLE")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("locale.supported");

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("CLEANCYCLE_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via CLEANCYCLE_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let mut config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    let max_ttl = i64::MAX as u64;
    config.auth.session_ttl_seconds = config.auth.session_ttl_seconds.min(max_ttl);
    config.auth.remember_me_ttl_seconds = config.auth.remember_me_ttl_seconds.min(max_ttl);

    if !config.locale.is_supported(&config.locale.default) {
        anyhow::bail!(
            "invalid configuration: default locale {} is not in the supported list",
            config.locale.default
        );
    }

    debug!(?config, "loaded backend configuration");
    Ok(config)
}
