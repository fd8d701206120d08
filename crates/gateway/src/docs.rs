use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(title = "CleanCycle API", description = "Laundry reservations and machine monitoring"),
    paths(
        crate::routes::health::health_check,
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::logout,
        crate::routes::auth::verify_email,
        crate::routes::auth::resend_verification,
        crate::routes::me::get_profile,
        crate::routes::me::update_profile,
        crate::routes::me::get_preferences,
        crate::routes::me::update_preferences,
        crate::routes::me::change_password,
        crate::routes::me::statistics,
        crate::routes::me::activity,
        crate::routes::machines::list_rooms,
        crate::routes::machines::room_machines,
        crate::routes::machines::room_stats,
        crate::routes::machines::available_machines,
        crate::routes::machines::list_machines,
        crate::routes::machines::get_machine,
        crate::routes::machines::machine_reservations,
        crate::routes::machines::maintenance_history,
        crate::routes::machines::machine_stats,
        crate::routes::machines::report_error,
        crate::routes::machines::start_session,
        crate::routes::sessions::active_sessions,
        crate::routes::sessions::session_history,
        crate::routes::sessions::finish_session,
        crate::routes::sessions::cancel_session,
        crate::routes::reservations::list_reservations,
        crate::routes::reservations::create_reservation,
        crate::routes::reservations::upcoming_reservations,
        crate::routes::reservations::check_availability,
        crate::routes::reservations::cancel_reservation,
        crate::routes::notifications::list_notifications,
        crate::routes::notifications::mark_notification_read,
        crate::routes::notifications::mark_all_read,
        crate::routes::notifications::delete_notification,
        crate::routes::notifications::notification_logs,
        crate::routes::notifications::mark_log_read,
        crate::routes::statistics::my_usage,
        crate::routes::statistics::dashboard,
        crate::routes::admin::list_users,
        crate::routes::admin::change_role,
        crate::routes::admin::list_reservations,
        crate::routes::admin::confirm_reservation,
        crate::routes::admin::complete_reservation,
        crate::routes::admin::override_status,
        crate::routes::admin::start_maintenance,
        crate::routes::admin::complete_maintenance,
        crate::routes::admin::resolve_error,
        crate::routes::admin::create_room,
        crate::routes::admin::create_machine,
        crate::routes::admin::operation_logs,
        crate::routes::admin::activity_logs,
        crate::routes::admin::run_sweep,
        crate::routes::web::manifest,
        crate::routes::web::localized_manifest,
        crate::routes::web::locale_redirect
    ),
    components(
        schemas(
            crate::error::ErrorResponse,
            crate::routes::health::HealthResponse,
            crate::routes::auth::RegisterRequest,
            crate::routes::auth::RegisterResponse,
            crate::routes::auth::LoginRequest,
            crate::routes::auth::LoginResponse,
            crate::routes::auth::VerifyEmailRequest,
            crate::routes::auth::VerifyEmailResponse,
            crate::routes::auth::ResendVerificationRequest,
            crate::routes::auth::ResendVerificationResponse,
            crate::routes::auth::MessageResponse,
            crate::routes::notifications::BulkUpdateResponse,
            crate::routes::admin::StatusOverrideResponse,
            cleancycle_database::User,
            cleancycle_database::UserRole,
            cleancycle_database::ProfileUpdate,
            cleancycle_database::UserPreferences,
            cleancycle_database::PreferencesUpdate,
            cleancycle_database::Room,
            cleancycle_database::NewRoom,
            cleancycle_database::Machine,
            cleancycle_database::NewMachine,
            cleancycle_database::MachineType,
            cleancycle_database::MachineStatus,
            cleancycle_database::MachineErrorRecord,
            cleancycle_database::ErrorSeverity,
            cleancycle_database::MaintenanceRecord,
            cleancycle_database::MaintenanceType,
            cleancycle_database::LaundrySession,
            cleancycle_database::SessionStatus,
            cleancycle_database::Reservation,
            cleancycle_database::ReservationStatus,
            cleancycle_database::Notification,
            cleancycle_database::NotificationType,
            cleancycle_database::NotificationLog,
            cleancycle_database::NotificationChannel,
            cleancycle_database::DeliveryStatus,
            cleancycle_database::ActivityLog,
            cleancycle_database::ActivityType,
            cleancycle_database::OperationLog,
            cleancycle_database::LogAction,
            cleancycle_laundry::StartSessionRequest,
            cleancycle_laundry::CreateReservationRequest,
            cleancycle_laundry::ReportErrorRequest,
            cleancycle_laundry::StartMaintenanceRequest,
            cleancycle_laundry::CompleteMaintenanceRequest,
            cleancycle_laundry::StatusOverrideRequest,
            cleancycle_laundry::RoleChangeRequest,
            cleancycle_laundry::ChangePasswordRequest,
            cleancycle_laundry::MachineDetail,
            cleancycle_laundry::NotificationList,
            cleancycle_laundry::DashboardStats,
            cleancycle_laundry::Availability,
            cleancycle_laundry::SweepReport,
            cleancycle_laundry::UsageStats,
            cleancycle_laundry::MachineUsageStats,
            cleancycle_laundry::LifetimeStats,
            cleancycle_laundry::StatusBreakdown
        )
    ),
    tags(
        (name = "Health", description = "Service health endpoints"),
        (name = "Auth", description = "Registration, login and email verification"),
        (name = "Profile", description = "The signed-in user's profile and preferences"),
        (name = "Machines", description = "Rooms, machines and fault reports"),
        (name = "Sessions", description = "Laundry cycles"),
        (name = "Reservations", description = "Booking machine time"),
        (name = "Notifications", description = "In-app notifications and delivery logs"),
        (name = "Statistics", description = "Usage statistics"),
        (name = "Admin", description = "Manager and admin operations"),
        (name = "Web", description = "Manifest and locale redirects")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        let mut http = Http::new(HttpAuthScheme::Bearer);
        http.bearer_format = Some("opaque".to_string());
        components
            .security_schemes
            .insert("bearerAuth".to_string(), SecurityScheme::Http(http));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_routes_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/machines/{machine_id}/start"));
        assert!(doc.paths.paths.contains_key("/api/admin/sweep"));

        let components = doc.components.expect("components present");
        assert!(components.security_schemes.contains_key("bearerAuth"));
    }
}
