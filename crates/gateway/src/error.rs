use axum::http::{header::RETRY_AFTER, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use cleancycle_auth::AuthError;
use cleancycle_laundry::LaundryError;
use serde::Serialize;
use tracing::{debug, error};
use utoipa::ToSchema;

use crate::i18n;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub needs_verification: Option<bool>,
}

/// An error on its way to the client. The stable `code` selects the
/// localized text; `message` is the English fallback.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub retry_after_seconds: Option<i64>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            retry_after_seconds: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "validation_error", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "forbidden", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, code, message)
    }

    pub fn internal_server_error() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "Internal server error",
        )
    }

    /// Render the body in `locale`, falling back to the English message.
    pub fn render(&self, locale: &str) -> Response {
        let body = ErrorResponse {
            error: i18n::translate(locale, self.code)
                .map(str::to_string)
                .unwrap_or_else(|| self.message.clone()),
            code: self.code.to_string(),
            needs_verification: (self.code == "email_not_verified").then_some(true),
        };

        let mut response = (self.status, Json(body)).into_response();
        if let Some(seconds) = self.retry_after_seconds {
            if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
        }
        response
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = self.render("en");
        // Picked up by `middleware::localize_errors`.
        response.extensions_mut().insert(self);
        response
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        let message = error.to_string();
        let api_error = match error {
            AuthError::Validation(_) => Self::bad_request(message.clone()),
            AuthError::UserExists(_) => Self::conflict("user_exists", message.clone()),
            AuthError::InvalidCredentials => {
                Self::new(StatusCode::UNAUTHORIZED, "invalid_credentials", message.clone())
            }
            AuthError::EmailNotVerified => {
                Self::new(StatusCode::FORBIDDEN, "email_not_verified", message.clone())
            }
            AuthError::UserNotFound => Self::new(StatusCode::NOT_FOUND, "user_not_found", message.clone()),
            AuthError::AlreadyVerified => {
                Self::new(StatusCode::BAD_REQUEST, "already_verified", message.clone())
            }
            AuthError::InvalidCode => Self::new(StatusCode::BAD_REQUEST, "invalid_code", message.clone()),
            AuthError::CodeExpired => Self::new(StatusCode::BAD_REQUEST, "code_expired", message.clone()),
            AuthError::TooManyAttempts => {
                Self::new(StatusCode::TOO_MANY_REQUESTS, "too_many_attempts", message.clone())
            }
            AuthError::ResendTooSoon {
                retry_after_seconds,
            } => Self {
                retry_after_seconds: Some(retry_after_seconds),
                ..Self::new(StatusCode::TOO_MANY_REQUESTS, "resend_too_soon", message.clone())
            },
            AuthError::SessionNotFound | AuthError::InvalidSession => {
                Self::new(StatusCode::UNAUTHORIZED, "unauthorized", message.clone())
            }
            AuthError::SessionExpired => {
                Self::new(StatusCode::UNAUTHORIZED, "session_expired", message.clone())
            }
            AuthError::Database(_) | AuthError::PasswordHash(_) => {
                error!(error = ?error, "auth error");
                return Self::internal_server_error();
            }
        };
        debug!(code = api_error.code, %message, "auth request rejected");
        api_error
    }
}

impl From<LaundryError> for ApiError {
    fn from(error: LaundryError) -> Self {
        let message = error.to_string();
        let api_error = match error {
            LaundryError::Auth(inner) => return inner.into(),
            LaundryError::NotFound { .. } => Self::not_found(message.clone()),
            LaundryError::Validation { .. } => Self::bad_request(message.clone()),
            LaundryError::PermissionDenied { .. } => Self::forbidden(message.clone()),
            LaundryError::MachineUnavailable { .. } => Self::conflict("machine_unavailable", message.clone()),
            LaundryError::ReservationConflict => Self::conflict("reservation_conflict", message.clone()),
            LaundryError::SessionNotActive { .. } => Self::conflict("session_not_active", message.clone()),
            LaundryError::InvalidTransition { .. } => Self::conflict("invalid_transition", message.clone()),
            LaundryError::Conflict { .. } => Self::conflict("conflict", message.clone()),
            LaundryError::Database(_) => {
                error!(error = ?error, "laundry service error");
                return Self::internal_server_error();
            }
        };
        debug!(code = api_error.code, %message, "request rejected");
        api_error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cleancycle_database::{DatabaseError, ReservationStatus};

    #[test]
    fn status_mapping() {
        let cases = [
            (ApiError::from(AuthError::Validation("bad".into())), StatusCode::BAD_REQUEST),
            (ApiError::from(AuthError::InvalidCredentials), StatusCode::UNAUTHORIZED),
            (ApiError::from(AuthError::EmailNotVerified), StatusCode::FORBIDDEN),
            (ApiError::from(AuthError::UserExists("email".into())), StatusCode::CONFLICT),
            (
                ApiError::from(AuthError::ResendTooSoon {
                    retry_after_seconds: 12,
                }),
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                ApiError::from(LaundryError::not_found("machine", 3)),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::from(LaundryError::permission_denied("staff only")),
                StatusCode::FORBIDDEN,
            ),
            (ApiError::from(LaundryError::ReservationConflict), StatusCode::CONFLICT),
            (
                ApiError::from(LaundryError::InvalidTransition {
                    from: ReservationStatus::Cancelled,
                    to: ReservationStatus::Confirmed,
                }),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::from(LaundryError::Auth(AuthError::SessionExpired)),
                StatusCode::UNAUTHORIZED,
            ),
            (
                ApiError::from(LaundryError::Database(DatabaseError::ConnectionError(
                    "down".into(),
                ))),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(error.status, status, "{}", error.code);
        }
    }

    #[test]
    fn internal_errors_hide_details() {
        let error = ApiError::from(LaundryError::Database(DatabaseError::ConnectionError(
            "secret path /var/db".into(),
        )));
        assert_eq!(error.code, "internal_error");
        assert!(!error.message.contains("/var/db"));
    }

    #[test]
    fn resend_throttle_sets_retry_after() {
        let error = ApiError::from(AuthError::ResendTooSoon {
            retry_after_seconds: 42,
        });
        let response = error.render("en");
        assert_eq!(response.headers().get(RETRY_AFTER).unwrap(), "42");
    }
}
