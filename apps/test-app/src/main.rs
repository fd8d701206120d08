use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use colored::*;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "api-test-app")]
#[command(about = "End-to-end walkthrough against a running CleanCycle backend")]
#[command(version = "1.0")]
struct Cli {
    #[arg(long, default_value = "http://localhost:7070")]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the server answers
    Health,
    /// Register, verify and log in a fresh resident
    TestAuth,
    /// Full resident walkthrough: auth, machines, sessions, reservations, notifications
    RunAll,
}

#[derive(Debug, Deserialize)]
struct Registered {
    verification_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Login {
    token: String,
}

#[derive(Debug, Deserialize)]
struct Machine {
    id: i64,
    name: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct Session {
    id: i64,
    status: String,
}

struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut request = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("request to {path} failed"))?;
        let status = response.status();
        let text = response.text().await?;
        let value = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        Ok((status, value))
    }

    async fn expect<T: for<'de> Deserialize<'de>>(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
        expected: StatusCode,
    ) -> Result<T> {
        let (status, value) = self.request(method, path, token, body).await?;
        if status != expected {
            return Err(anyhow::anyhow!(
                "{path}: expected {expected}, got {status}: {value}"
            ));
        }
        serde_json::from_value(value).with_context(|| format!("failed to parse {path} response"))
    }

    async fn health(&self) -> Result<()> {
        println!("🩺 Checking server health");
        let body: Value = self
            .expect(Method::GET, "/health", None, None, StatusCode::OK)
            .await?;
        println!("✅ Server is {}", body["status"].to_string().green());
        Ok(())
    }

    /// Returns a bearer token for a brand-new verified resident.
    async fn sign_up(&self) -> Result<String> {
        let suffix = Utc::now().timestamp_millis();
        let username = format!("resident{suffix}");
        let email = format!("{username}@example.com");
        let password = "walkthrough-pass";
        println!("👤 Registering {}", email);

        let registered: Registered = self
            .expect(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({
                    "email": email,
                    "password": password,
                    "username": username,
                    "first_name": "Smoke",
                    "last_name": "Test",
                    "apartment_number": "4B"
                })),
                StatusCode::CREATED,
            )
            .await?;

        let code = registered.verification_code.context(
            "server did not return the verification code; run it as a debug build",
        )?;

        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await?;
        if status != StatusCode::FORBIDDEN || body["needs_verification"] != true {
            return Err(anyhow::anyhow!("unverified login should be refused, got {status}"));
        }
        println!("🔒 Unverified login refused as expected");

        let _: Value = self
            .expect(
                Method::POST,
                "/api/auth/verify-email",
                None,
                Some(json!({ "email": email, "code": code })),
                StatusCode::OK,
            )
            .await?;
        println!("📧 Email verified with code {}", code.yellow());

        let login: Login = self
            .expect(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": email, "password": password, "remember_me": true })),
                StatusCode::OK,
            )
            .await?;
        println!("✅ Logged in");
        Ok(login.token)
    }

    async fn machine_walkthrough(&self, token: &str) -> Result<()> {
        let machines: Vec<Machine> = self
            .expect(Method::GET, "/api/machines", Some(token), None, StatusCode::OK)
            .await?;
        println!("🧺 Found {} machines", machines.len().to_string().yellow());

        let Some(machine) = machines.iter().find(|machine| machine.status == "free") else {
            println!("{}", "⚠️  No free machine; run `cleancycle-backend seed` first".yellow());
            return Ok(());
        };

        let session: Session = self
            .expect(
                Method::POST,
                &format!("/api/machines/{}/start", machine.id),
                Some(token),
                Some(json!({ "duration_minutes": 30 })),
                StatusCode::CREATED,
            )
            .await?;
        println!("▶️  Started {} (session {})", machine.name, session.id);

        let (status, body) = self
            .request(
                Method::POST,
                &format!("/api/machines/{}/start", machine.id),
                Some(token),
                None,
            )
            .await?;
        if status != StatusCode::CONFLICT {
            return Err(anyhow::anyhow!("second start should conflict, got {status}: {body}"));
        }
        println!("🚫 Second start rejected: {}", body["code"]);

        let finished: Session = self
            .expect(
                Method::POST,
                &format!("/api/sessions/{}/finish", session.id),
                Some(token),
                None,
                StatusCode::OK,
            )
            .await?;
        println!("⏹️  Session {}", finished.status.green());

        let start = Utc::now() + Duration::hours(2);
        let reservation: Value = self
            .expect(
                Method::POST,
                "/api/reservations",
                Some(token),
                Some(json!({
                    "machine_id": machine.id,
                    "start_time": start,
                    "end_time": start + Duration::minutes(60),
                    "notes": "walkthrough"
                })),
                StatusCode::CREATED,
            )
            .await?;
        println!("📅 Reservation {} is {}", reservation["id"], reservation["status"]);
        Ok(())
    }

    async fn notifications(&self, token: &str) -> Result<()> {
        let list: Value = self
            .expect(Method::GET, "/api/notifications", Some(token), None, StatusCode::OK)
            .await?;
        println!("🔔 Unread notifications: {}", list["unread_count"]);

        let dashboard: Value = self
            .expect(
                Method::GET,
                "/api/statistics/dashboard",
                Some(token),
                None,
                StatusCode::OK,
            )
            .await?;
        println!("📊 Dashboard: {}", dashboard);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let api = ApiClient::new(cli.api_url.trim_end_matches('/').to_string());

    match cli.command {
        Commands::Health => api.health().await?,
        Commands::TestAuth => {
            api.sign_up().await?;
        }
        Commands::RunAll => {
            api.health().await?;
            let token = api.sign_up().await?;
            api.machine_walkthrough(&token).await?;
            api.notifications(&token).await?;
            let _: Value = api
                .expect(Method::POST, "/api/auth/logout", Some(&token), None, StatusCode::OK)
                .await?;
            println!("{}", "🎉 All checks passed".green().bold());
        }
    }
    Ok(())
}
