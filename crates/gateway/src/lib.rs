//! # CleanCycle Gateway Crate
//!
//! The HTTP surface of the backend: an axum router mapping JSON endpoints onto
//! the laundry services, bearer authentication, error translation with
//! localized messages, the web manifest, and OpenAPI documentation.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cleancycle_gateway::{build_router, AppState};
//!
//! let state = AppState::new(pool, authenticator, services, config.locale.clone());
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:7070").await?;
//! axum::serve(listener, build_router(state)).await?;
//! ```

mod error;
mod middleware;
mod state;
mod util;

pub mod docs;
pub mod i18n;
pub mod routes;

pub use error::{ApiError, ErrorResponse};
pub use state::AppState;

use axum::{
    http::{
        header::{ACCEPT_LANGUAGE, AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

pub fn build_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/health", get(routes::health::health_check))
        // Auth
        .route("/api/auth/register", post(routes::auth::register))
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/logout", post(routes::auth::logout))
        .route("/api/auth/verify-email", post(routes::auth::verify_email))
        .route(
            "/api/auth/resend-verification",
            post(routes::auth::resend_verification),
        )
        // Profile
        .route(
            "/api/me",
            get(routes::me::get_profile).put(routes::me::update_profile),
        )
        .route(
            "/api/me/preferences",
            get(routes::me::get_preferences).put(routes::me::update_preferences),
        )
        .route("/api/me/password", post(routes::me::change_password))
        .route("/api/me/statistics", get(routes::me::statistics))
        .route("/api/me/activity", get(routes::me::activity))
        // Rooms and machines
        .route("/api/rooms", get(routes::machines::list_rooms))
        .route(
            "/api/rooms/:room_id/machines",
            get(routes::machines::room_machines),
        )
        .route("/api/rooms/:room_id/stats", get(routes::machines::room_stats))
        .route(
            "/api/rooms/:room_id/available",
            get(routes::machines::available_machines),
        )
        .route("/api/machines", get(routes::machines::list_machines))
        .route("/api/machines/:machine_id", get(routes::machines::get_machine))
        .route(
            "/api/machines/:machine_id/reservations",
            get(routes::machines::machine_reservations),
        )
        .route(
            "/api/machines/:machine_id/maintenance",
            get(routes::machines::maintenance_history),
        )
        .route(
            "/api/machines/:machine_id/stats",
            get(routes::machines::machine_stats),
        )
        .route(
            "/api/machines/:machine_id/errors",
            post(routes::machines::report_error),
        )
        .route(
            "/api/machines/:machine_id/start",
            post(routes::machines::start_session),
        )
        // Laundry sessions
        .route("/api/sessions", get(routes::sessions::active_sessions))
        .route("/api/sessions/history", get(routes::sessions::session_history))
        .route(
            "/api/sessions/:session_id/finish",
            post(routes::sessions::finish_session),
        )
        .route(
            "/api/sessions/:session_id/cancel",
            post(routes::sessions::cancel_session),
        )
        // Reservations
        .route(
            "/api/reservations",
            get(routes::reservations::list_reservations)
                .post(routes::reservations::create_reservation),
        )
        .route(
            "/api/reservations/upcoming",
            get(routes::reservations::upcoming_reservations),
        )
        .route(
            "/api/reservations/availability",
            get(routes::reservations::check_availability),
        )
        .route(
            "/api/reservations/:reservation_id/cancel",
            post(routes::reservations::cancel_reservation),
        )
        // Notifications
        .route(
            "/api/notifications",
            get(routes::notifications::list_notifications),
        )
        .route(
            "/api/notifications/read-all",
            post(routes::notifications::mark_all_read),
        )
        .route(
            "/api/notifications/logs",
            get(routes::notifications::notification_logs),
        )
        .route(
            "/api/notifications/logs/:log_id/read",
            post(routes::notifications::mark_log_read),
        )
        .route(
            "/api/notifications/:notification_id",
            delete(routes::notifications::delete_notification),
        )
        .route(
            "/api/notifications/:notification_id/read",
            post(routes::notifications::mark_notification_read),
        )
        // Statistics
        .route("/api/statistics/me", get(routes::statistics::my_usage))
        .route(
            "/api/statistics/dashboard",
            get(routes::statistics::dashboard),
        )
        // Admin
        .route("/api/admin/users", get(routes::admin::list_users))
        .route(
            "/api/admin/users/:public_id/role",
            put(routes::admin::change_role),
        )
        .route(
            "/api/admin/reservations",
            get(routes::admin::list_reservations),
        )
        .route(
            "/api/admin/reservations/:reservation_id/confirm",
            post(routes::admin::confirm_reservation),
        )
        .route(
            "/api/admin/reservations/:reservation_id/complete",
            post(routes::admin::complete_reservation),
        )
        .route(
            "/api/admin/machines/:machine_id/status",
            put(routes::admin::override_status),
        )
        .route(
            "/api/admin/machines/:machine_id/maintenance",
            post(routes::admin::start_maintenance),
        )
        .route(
            "/api/admin/maintenance/:maintenance_id/complete",
            post(routes::admin::complete_maintenance),
        )
        .route(
            "/api/admin/errors/:error_id/resolve",
            post(routes::admin::resolve_error),
        )
        .route("/api/admin/rooms", post(routes::admin::create_room))
        .route("/api/admin/machines", post(routes::admin::create_machine))
        .route("/api/admin/logs", get(routes::admin::operation_logs))
        .route("/api/admin/activity", get(routes::admin::activity_logs))
        .route("/api/admin/sweep", post(routes::admin::run_sweep))
        // Web client
        .route("/manifest.json", get(routes::web::manifest))
        .route(
            "/:locale/manifest.webmanifest",
            get(routes::web::localized_manifest),
        )
        .route("/", get(routes::web::locale_redirect));

    #[cfg(debug_assertions)]
    let router = {
        use utoipa::OpenApi;
        router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", docs::ApiDoc::openapi()),
        )
    };

    router
        .layer(from_fn_with_state(state.clone(), middleware::localize_errors))
        .layer(from_fn(middleware::logging_middleware))
        .layer(middleware::trace_layer())
        .layer(cors_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT_LANGUAGE])
}
