//! Role checks for staff-only operations.

use cleancycle_database::{User, UserRole};

use crate::types::{LaundryError, LaundryResult};

pub struct PermissionChecker;

impl PermissionChecker {
    /// Managers and admins.
    pub fn require_staff(user: &User) -> LaundryResult<()> {
        if !user.is_staff() {
            return Err(LaundryError::permission_denied("manager or admin role required"));
        }
        Ok(())
    }

    pub fn require_admin(user: &User) -> LaundryResult<()> {
        if user.role != UserRole::Admin {
            return Err(LaundryError::permission_denied("admin role required"));
        }
        Ok(())
    }

    /// The owner of a resource, or staff.
    pub fn require_owner_or_staff(user: &User, owner_id: i64) -> LaundryResult<()> {
        if user.id != owner_id && !user.is_staff() {
            return Err(LaundryError::permission_denied(
                "only the owner or staff may do this",
            ));
        }
        Ok(())
    }
}
