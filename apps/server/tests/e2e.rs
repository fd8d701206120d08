use axum::{
    body::Body,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method, Request, StatusCode,
    },
    Router,
};
use chrono::{Duration, Utc};
use cleancycle_config::AppConfig;
use cleancycle_database::{AuthSessionRepository, NewUser, UserRepository, UserRole};
use cleancycle_gateway::{build_router, AppState};
use cleancycle_runtime::BackendServices;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;

const ADMIN_TOKEN: &str = "admin-token";
const ANNA_TOKEN: &str = "anna-token";
const BELA_TOKEN: &str = "bela-token";

struct TestApp {
    router: Router,
    pool: SqlitePool,
    _db_dir: TempDir,
}

struct TestResponse {
    status: StatusCode,
    text: String,
    json: Value,
}

impl TestApp {
    async fn new() -> Self {
        let db_dir = TempDir::new().expect("create temp dir");
        let db_path = db_dir.path().join("cleancycle-test.db");

        let mut config = AppConfig::default();
        config.database.url = format!("sqlite://{}", db_path.to_string_lossy());
        config.database.max_connections = 5;

        let services = BackendServices::initialise(&config)
            .await
            .expect("initialise backend services");

        let state = AppState::new(
            services.db_pool.clone(),
            services.authenticator.clone(),
            services.laundry.clone(),
            config.locale.clone(),
        );

        let app = Self {
            router: build_router(state),
            pool: services.db_pool.clone(),
            _db_dir: db_dir,
        };
        app.create_user_with_session("admin@example.com", "admin", UserRole::Admin, ADMIN_TOKEN)
            .await;
        app.create_user_with_session("anna@example.com", "anna", UserRole::User, ANNA_TOKEN)
            .await;
        app.create_user_with_session("bela@example.com", "bela", UserRole::User, BELA_TOKEN)
            .await;
        app
    }

    async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let body = if let Some(json_body) = body {
            let bytes = serde_json::to_vec(&json_body).expect("serialize request body");
            builder = builder.header(CONTENT_TYPE, "application/json");
            Body::from(bytes)
        } else {
            Body::empty()
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).expect("build request"))
            .await
            .expect("dispatch request");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect response body")
            .to_bytes();
        let text = String::from_utf8(bytes.to_vec()).unwrap_or_default();
        let json = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::Null)
        };

        TestResponse { status, text, json }
    }

    /// Seeds a verified account with a live bearer token, bypassing the
    /// registration flow.
    async fn create_user_with_session(
        &self,
        email: &str,
        username: &str,
        role: UserRole,
        token: &str,
    ) -> i64 {
        let users = UserRepository::new(self.pool.clone());
        let now = Utc::now();
        let user = users
            .create_with_password(
                &NewUser {
                    email: email.to_string(),
                    username: username.to_string(),
                    first_name: username.to_string(),
                    last_name: "Tester".to_string(),
                    phone: None,
                    apartment_number: None,
                    room_id: None,
                },
                "unused-hash",
                "unused-code",
                now + Duration::hours(1),
                now,
            )
            .await
            .expect("insert user");
        users.mark_verified(user.id, now).await.expect("verify user");
        if role != UserRole::User {
            users.update_role(user.id, role, now).await.expect("set role");
        }

        AuthSessionRepository::new(self.pool.clone())
            .create(token, user.id, now + Duration::days(1), now)
            .await
            .expect("insert auth session");
        user.id
    }

    async fn washer(&self) -> i64 {
        let room = self
            .request(
                Method::POST,
                "/api/admin/rooms",
                Some(json!({ "name": "Courtyard" })),
                Some(ADMIN_TOKEN),
            )
            .await;
        assert_eq!(room.status, StatusCode::CREATED, "{}", room.text);

        let machine = self
            .request(
                Method::POST,
                "/api/admin/machines",
                Some(json!({
                    "room_id": room.json["id"],
                    "name": "Washer A",
                    "type": "washer"
                })),
                Some(ADMIN_TOKEN),
            )
            .await;
        assert_eq!(machine.status, StatusCode::CREATED, "{}", machine.text);
        machine.json["id"].as_i64().expect("machine id")
    }
}

fn window(machine_id: i64, from_minutes: i64, to_minutes: i64) -> Value {
    let now = Utc::now();
    json!({
        "machine_id": machine_id,
        "start_time": now + Duration::minutes(from_minutes),
        "end_time": now + Duration::minutes(to_minutes),
    })
}

fn availability_uri(machine_id: i64, from_minutes: i64, to_minutes: i64) -> String {
    let now = Utc::now();
    let start = (now + Duration::minutes(from_minutes)).format("%Y-%m-%dT%H:%M:%SZ");
    let end = (now + Duration::minutes(to_minutes)).format("%Y-%m-%dT%H:%M:%SZ");
    format!("/api/reservations/availability?machine_id={machine_id}&start={start}&end={end}")
}

#[tokio::test(flavor = "multi_thread")]
async fn confirmed_reservations_block_overlapping_slots() {
    let app = TestApp::new().await;
    let machine_id = app.washer().await;

    let first = app
        .request(
            Method::POST,
            "/api/reservations",
            Some(window(machine_id, 60, 120)),
            Some(ANNA_TOKEN),
        )
        .await;
    assert_eq!(first.status, StatusCode::CREATED, "{}", first.text);
    assert_eq!(first.json["status"], "pending");

    // Pending reservations do not hold the slot yet.
    let second = app
        .request(
            Method::POST,
            "/api/reservations",
            Some(window(machine_id, 90, 150)),
            Some(BELA_TOKEN),
        )
        .await;
    assert_eq!(second.status, StatusCode::CREATED, "{}", second.text);

    let first_id = first.json["id"].as_i64().expect("reservation id");
    let second_id = second.json["id"].as_i64().expect("reservation id");

    let confirmed = app
        .request(
            Method::POST,
            &format!("/api/admin/reservations/{first_id}/confirm"),
            None,
            Some(ADMIN_TOKEN),
        )
        .await;
    assert_eq!(confirmed.status, StatusCode::OK, "{}", confirmed.text);
    assert_eq!(confirmed.json["status"], "confirmed");

    let clash = app
        .request(
            Method::POST,
            &format!("/api/admin/reservations/{second_id}/confirm"),
            None,
            Some(ADMIN_TOKEN),
        )
        .await;
    assert_eq!(clash.status, StatusCode::CONFLICT, "{}", clash.text);
    assert_eq!(clash.json["code"], "reservation_conflict");

    let late = app
        .request(
            Method::POST,
            "/api/reservations",
            Some(window(machine_id, 100, 110)),
            Some(BELA_TOKEN),
        )
        .await;
    assert_eq!(late.status, StatusCode::CONFLICT, "{}", late.text);

    let busy = app
        .request(Method::GET, &availability_uri(machine_id, 100, 110), None, Some(BELA_TOKEN))
        .await;
    assert_eq!(busy.status, StatusCode::OK, "{}", busy.text);
    assert_eq!(busy.json["available"], false);

    let after = app
        .request(Method::GET, &availability_uri(machine_id, 130, 140), None, Some(BELA_TOKEN))
        .await;
    assert_eq!(after.json["available"], true);

    let foreign_cancel = app
        .request(
            Method::POST,
            &format!("/api/reservations/{first_id}/cancel"),
            None,
            Some(BELA_TOKEN),
        )
        .await;
    assert_eq!(foreign_cancel.status, StatusCode::FORBIDDEN);

    let cancelled = app
        .request(
            Method::POST,
            &format!("/api/reservations/{first_id}/cancel"),
            None,
            Some(ANNA_TOKEN),
        )
        .await;
    assert_eq!(cancelled.status, StatusCode::OK, "{}", cancelled.text);
    assert_eq!(cancelled.json["status"], "cancelled");

    let retried = app
        .request(
            Method::POST,
            &format!("/api/admin/reservations/{second_id}/confirm"),
            None,
            Some(ADMIN_TOKEN),
        )
        .await;
    assert_eq!(retried.status, StatusCode::OK, "{}", retried.text);

    let now = Utc::now();
    let calendar = app
        .request(
            Method::GET,
            &format!(
                "/api/machines/{machine_id}/reservations?start={}&end={}",
                now.format("%Y-%m-%dT%H:%M:%SZ"),
                (now + Duration::hours(4)).format("%Y-%m-%dT%H:%M:%SZ"),
            ),
            None,
            Some(ANNA_TOKEN),
        )
        .await;
    assert_eq!(calendar.status, StatusCode::OK, "{}", calendar.text);
    let booked = calendar.json.as_array().expect("reservation list");
    assert_eq!(booked.len(), 1);
    assert_eq!(booked[0]["id"], second_id);

    let history = app
        .request(Method::GET, "/api/reservations?status=cancelled", None, Some(ANNA_TOKEN))
        .await;
    assert_eq!(history.status, StatusCode::OK);
    let listed = history.json.as_array().expect("reservation list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], first_id);
}

#[tokio::test(flavor = "multi_thread")]
async fn critical_fault_takes_machine_offline_until_overridden() {
    let app = TestApp::new().await;
    let machine_id = app.washer().await;

    let report = app
        .request(
            Method::POST,
            &format!("/api/machines/{machine_id}/errors"),
            Some(json!({
                "error_code": "E21",
                "error_message": "Door sensor stuck",
                "severity": "critical"
            })),
            Some(ANNA_TOKEN),
        )
        .await;
    assert_eq!(report.status, StatusCode::CREATED, "{}", report.text);
    let error_id = report.json["id"].as_i64().expect("error id");

    let detail = app
        .request(Method::GET, &format!("/api/machines/{machine_id}"), None, Some(BELA_TOKEN))
        .await;
    assert_eq!(detail.json["status"], "broken");
    assert_eq!(detail.json["unresolved_errors"].as_array().map(Vec::len), Some(1));

    let inbox = app
        .request(Method::GET, "/api/notifications", None, Some(BELA_TOKEN))
        .await;
    assert_eq!(inbox.status, StatusCode::OK);
    assert!(inbox.json["unread_count"].as_i64().unwrap_or_default() >= 1);
    assert!(inbox.text.contains("Door sensor stuck"), "{}", inbox.text);

    let refused = app
        .request(
            Method::POST,
            &format!("/api/machines/{machine_id}/start"),
            Some(json!({})),
            Some(BELA_TOKEN),
        )
        .await;
    assert_eq!(refused.status, StatusCode::CONFLICT);
    assert_eq!(refused.json["code"], "machine_unavailable");

    let resident_resolve = app
        .request(
            Method::POST,
            &format!("/api/admin/errors/{error_id}/resolve"),
            None,
            Some(ANNA_TOKEN),
        )
        .await;
    assert_eq!(resident_resolve.status, StatusCode::FORBIDDEN);

    let resolved = app
        .request(
            Method::POST,
            &format!("/api/admin/errors/{error_id}/resolve"),
            None,
            Some(ADMIN_TOKEN),
        )
        .await;
    assert_eq!(resolved.status, StatusCode::OK, "{}", resolved.text);

    let overridden = app
        .request(
            Method::PUT,
            &format!("/api/admin/machines/{machine_id}/status"),
            Some(json!({ "status": "free" })),
            Some(ADMIN_TOKEN),
        )
        .await;
    assert_eq!(overridden.status, StatusCode::OK, "{}", overridden.text);
    assert_eq!(overridden.json["previous_status"], "broken");
    assert_eq!(overridden.json["machine"]["status"], "free");

    let started = app
        .request(
            Method::POST,
            &format!("/api/machines/{machine_id}/start"),
            Some(json!({})),
            Some(BELA_TOKEN),
        )
        .await;
    assert_eq!(started.status, StatusCode::CREATED, "{}", started.text);

    let logs = app
        .request(
            Method::GET,
            "/api/admin/logs?limit=20",
            None,
            Some(ADMIN_TOKEN),
        )
        .await;
    assert_eq!(logs.status, StatusCode::OK, "{}", logs.text);
    assert!(!logs.json.as_array().map(Vec::is_empty).unwrap_or(true));
}
