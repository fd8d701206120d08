//! Test plan for the `cleancycle-config` crate.
//!
//! Covers default handling, file discovery, environment overrides, and
//! validation of the loaded configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serial_test::serial;
use tempfile::TempDir;

use cleancycle_config::{
    load, AppConfig, AuthConfig, HttpConfig, LocaleConfig, MailConfig, SweepConfig,
    SUPPORTED_LOCALES,
};

const ENV_VARS_TO_RESET: &[&str] = &[
    "CLEANCYCLE_CONFIG",
    "CLEANCYCLE__AUTH__SESSION_TTL_SECONDS",
    "CLEANCYCLE__AUTH__VERIFICATION_MAX_ATTEMPTS",
    "CLEANCYCLE__DATABASE__MAX_CONNECTIONS",
    "CLEANCYCLE__DATABASE__URL",
    "CLEANCYCLE__HTTP__ADDRESS",
    "CLEANCYCLE__HTTP__PORT",
    "CLEANCYCLE__LOCALE__DEFAULT",
    "CLEANCYCLE__LOCALE__SUPPORTED",
    "CLEANCYCLE__MAIL__ENABLED",
    "CLEANCYCLE__MAIL__SMTP_PASSWORD",
    "CLEANCYCLE__MAIL__SMTP_USER",
    "CLEANCYCLE__SWEEP__INTERVAL_SECONDS",
];

struct TestContext {
    vars: Vec<(String, Option<String>)>,
    original_dir: Option<PathBuf>,
}

impl TestContext {
    fn new() -> Self {
        Self {
            vars: Vec::new(),
            original_dir: None,
        }
    }

    fn isolated(dir: &Path) -> Self {
        let mut ctx = Self::new();
        ctx.reset_environment();
        ctx.set_current_dir(dir);
        ctx
    }

    fn reset_environment(&mut self) {
        for key in ENV_VARS_TO_RESET {
            self.remove_var(key);
        }
    }

    fn set_var(&mut self, key: &str, value: impl AsRef<str>) {
        let previous = std::env::var(key).ok();
        std::env::set_var(key, value.as_ref());
        self.vars.push((key.to_string(), previous));
    }

    fn remove_var(&mut self, key: &str) {
        let previous = std::env::var(key).ok();
        std::env::remove_var(key);
        self.vars.push((key.to_string(), previous));
    }

    fn set_current_dir(&mut self, dir: &Path) {
        if self.original_dir.is_none() {
            self.original_dir =
                Some(std::env::current_dir().expect("failed to capture current directory"));
        }
        std::env::set_current_dir(dir).expect("failed to set current directory");
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        if let Some(original) = self.original_dir.take() {
            let _ = std::env::set_current_dir(original);
        }

        while let Some((key, value)) = self.vars.pop() {
            match value {
                Some(val) => std::env::set_var(&key, val),
                None => std::env::remove_var(&key),
            }
        }
    }
}

fn write_config_file(root: &Path, relative: &str, contents: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("failed to create config directories");
    }
    fs::write(&path, contents).expect("failed to write config file");
    path
}

#[test]
#[serial]
fn load_uses_default_values_when_no_files_found() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let _ctx = TestContext::isolated(temp_dir.path());

    let config = load().expect("configuration load should succeed without files");
    let defaults = AppConfig::default();

    assert_eq!(config.http.address, defaults.http.address);
    assert_eq!(config.http.port, defaults.http.port);
    assert_eq!(config.database.url, defaults.database.url);
    assert_eq!(
        config.database.max_connections,
        defaults.database.max_connections
    );
    assert_eq!(config.auth.session_ttl_seconds, defaults.auth.session_ttl_seconds);
    assert_eq!(
        config.auth.verification_code_ttl_seconds,
        defaults.auth.verification_code_ttl_seconds
    );
    assert!(!config.mail.enabled);
    assert_eq!(config.sweep.interval_seconds, 30);
    assert_eq!(config.locale.default, "en");
    assert_eq!(config.locale.supported.len(), SUPPORTED_LOCALES.len());
}

#[test]
#[serial]
fn load_picks_first_available_file_in_search_order() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let _ctx = TestContext::isolated(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "cleancycle.toml",
        r#"
        [http]
        port = 4242
        "#,
    );
    write_config_file(
        temp_dir.path(),
        "config/cleancycle.toml",
        r#"
        [http]
        port = 5151
        "#,
    );

    let config = load().expect("configuration load should pick the first file");
    assert_eq!(config.http.port, 4242);
}

#[test]
#[serial]
fn load_prefers_explicit_config_path() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::isolated(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "cleancycle.toml",
        r#"
        [http]
        port = 4242
        "#,
    );
    let explicit = write_config_file(
        temp_dir.path(),
        "elsewhere/custom.toml",
        r#"
        [http]
        port = 6161
        "#,
    );
    ctx.set_var("CLEANCYCLE_CONFIG", explicit.display().to_string());

    let config = load().expect("configuration load should use CLEANCYCLE_CONFIG");
    assert_eq!(config.http.port, 6161);
}

#[test]
#[serial]
fn load_merges_partial_file_with_defaults() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let _ctx = TestContext::isolated(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "cleancycle.toml",
        r#"
        [http]
        port = 8181

        [database]
        max_connections = 50

        [mail]
        enabled = true
        smtp_user = "laundry@example.com"
        "#,
    );

    let config = load().expect("configuration load should succeed");
    let defaults = AppConfig::default();

    assert_eq!(config.http.port, 8181);
    assert_eq!(config.http.address, defaults.http.address);
    assert_eq!(config.database.max_connections, 50);
    assert_eq!(config.database.url, defaults.database.url);
    assert!(config.mail.enabled);
    assert_eq!(config.mail.smtp_user.as_deref(), Some("laundry@example.com"));
    assert_eq!(config.mail.smtp_host, defaults.mail.smtp_host);
    assert_eq!(config.mail.smtp_port, defaults.mail.smtp_port);
    assert_eq!(config.auth.verification_max_attempts, 5);
}

#[test]
#[serial]
fn load_applies_environment_overrides() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::isolated(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "cleancycle.toml",
        r#"
        [http]
        port = 3030

        [sweep]
        interval_seconds = 10
        "#,
    );

    ctx.set_var("CLEANCYCLE__HTTP__PORT", "8080");
    ctx.set_var("CLEANCYCLE__SWEEP__INTERVAL_SECONDS", "0");

    let config = load().expect("configuration load should honour env overrides");
    assert_eq!(config.http.port, 8080);
    assert_eq!(config.sweep.interval_seconds, 0);
}

#[test]
#[serial]
fn load_supports_database_url_environment_variable() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::isolated(temp_dir.path());

    let url = "sqlite:///var/lib/cleancycle/cleancycle.db";
    ctx.set_var("CLEANCYCLE__DATABASE__URL", url);

    let config = load().expect("configuration load should read database env override");
    assert_eq!(config.database.url, url);
}

#[test]
#[serial]
fn load_reads_supported_locales_as_comma_separated_list() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::isolated(temp_dir.path());

    ctx.set_var("CLEANCYCLE__LOCALE__SUPPORTED", "en,hu");
    ctx.set_var("CLEANCYCLE__LOCALE__DEFAULT", "hu");

    let config = load().expect("configuration load should parse locale list");
    assert_eq!(config.locale.supported, vec!["en".to_string(), "hu".to_string()]);
    assert_eq!(config.locale.default, "hu");
}

#[test]
#[serial]
fn load_rejects_default_locale_outside_supported_list() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let _ctx = TestContext::isolated(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "cleancycle.toml",
        r#"
        [locale]
        default = "xx"
        "#,
    );

    let error = load().expect_err("unknown default locale should fail");
    assert!(error.to_string().contains("invalid configuration"));
}

#[test]
#[serial]
fn load_reads_session_ttl_from_environment() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::isolated(temp_dir.path());

    ctx.set_var("CLEANCYCLE__AUTH__SESSION_TTL_SECONDS", "3600");
    ctx.set_var("CLEANCYCLE__AUTH__VERIFICATION_MAX_ATTEMPTS", "3");

    let config = load().expect("configuration load should read auth overrides");
    assert_eq!(config.auth.session_ttl_seconds, 3600);
    assert_eq!(config.auth.verification_max_attempts, 3);
    assert_eq!(config.auth.remember_me_ttl_seconds, 2_592_000);
}

#[test]
#[serial]
fn load_errors_on_invalid_toml_contents() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let _ctx = TestContext::isolated(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "cleancycle.toml",
        r#"
        [http]
        port = "not-a-number
        "#,
    );

    let error = load().expect_err("invalid TOML should cause load to fail");
    let message = error.to_string();
    assert!(
        message.contains("invalid configuration") || message.contains("unable to build configuration"),
        "unexpected error message: {message}"
    );
}

#[test]
fn auth_config_defaults_match_verification_policy() {
    let defaults = AuthConfig::default();
    assert_eq!(defaults.session_ttl_seconds, 86_400);
    assert_eq!(defaults.remember_me_ttl_seconds, 2_592_000);
    assert_eq!(defaults.verification_code_ttl_seconds, 15 * 60);
    assert_eq!(defaults.verification_resend_cooldown_seconds, 60);
}

#[test]
fn mail_config_defaults_to_disabled_gmail_relay() {
    let defaults = MailConfig::default();
    assert!(!defaults.enabled);
    assert_eq!(defaults.smtp_host, "smtp.gmail.com");
    assert_eq!(defaults.smtp_port, 587);
    assert_eq!(defaults.from_name, "CleanCycle");
    assert!(defaults.smtp_password.is_none());
}

#[test]
fn http_config_defaults_match_expected_host_and_port() {
    let defaults = HttpConfig::default();
    assert_eq!(defaults.address, "127.0.0.1");
    assert_eq!(defaults.port, 7070);
    assert!(defaults.public_url.is_none());
}

#[test]
fn sweep_and_locale_defaults() {
    assert_eq!(SweepConfig::default().interval_seconds, 30);

    let locale = LocaleConfig::default();
    assert!(locale.is_supported("hu"));
    assert!(locale.is_supported("sk"));
    assert!(!locale.is_supported("es"));
}
