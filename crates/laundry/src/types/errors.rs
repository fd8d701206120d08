//! Error types for the laundry service layer.

use cleancycle_auth::AuthError;
use cleancycle_database::{DatabaseError, ReservationStatus};
use thiserror::Error;

/// Result type alias for laundry operations
pub type LaundryResult<T> = Result<T, LaundryError>;

#[derive(Debug, Error)]
pub enum LaundryError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Permission denied: {reason}")]
    PermissionDenied { reason: String },

    #[error("Machine {machine_id} is not available")]
    MachineUnavailable { machine_id: i64 },

    #[error("Time slot overlaps a confirmed reservation")]
    ReservationConflict,

    #[error("Session {session_id} is no longer active")]
    SessionNotActive { session_id: i64 },

    #[error("Reservation cannot move from {from} to {to}")]
    InvalidTransition {
        from: ReservationStatus,
        to: ReservationStatus,
    },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Database error: {0}")]
    Database(DatabaseError),
}

impl LaundryError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn permission_denied(reason: impl Into<String>) -> Self {
        Self::PermissionDenied {
            reason: reason.into(),
        }
    }
}

impl From<DatabaseError> for LaundryError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::ValidationError(message) => Self::Validation { message },
            DatabaseError::Conflict(message) => Self::Conflict { message },
            DatabaseError::Duplicate(field) => Self::Conflict {
                message: format!("{field} already exists"),
            },
            DatabaseError::NotFound(what) => Self::NotFound {
                entity: "record",
                id: what,
            },
            other => Self::Database(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_errors_map_to_domain_variants() {
        let err: LaundryError = DatabaseError::ValidationError("bad".into()).into();
        assert!(matches!(err, LaundryError::Validation { .. }));

        let err: LaundryError = DatabaseError::Duplicate("name".into()).into();
        assert!(matches!(err, LaundryError::Conflict { message } if message == "name already exists"));

        let err: LaundryError = DatabaseError::QueryError("boom".into()).into();
        assert!(matches!(err, LaundryError::Database(_)));
    }
}
