//! Read side of the audit trail.

use cleancycle_database::{
    ActivityFilter, ActivityLog, ActivityRepository, OperationLog, Page, User,
};
use sqlx::SqlitePool;

use crate::types::LaundryResult;
use crate::utils::PermissionChecker;

pub struct ActivityService {
    activity: ActivityRepository,
}

impl ActivityService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            activity: ActivityRepository::new(pool),
        }
    }

    pub async fn for_user(&self, user: &User, limit: Option<i64>) -> LaundryResult<Vec<ActivityLog>> {
        Ok(self
            .activity
            .list_for_user(user.id, Page::new(limit, None))
            .await?)
    }

    pub async fn list(
        &self,
        actor: &User,
        filter: &ActivityFilter,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> LaundryResult<Vec<ActivityLog>> {
        PermissionChecker::require_staff(actor)?;
        Ok(self.activity.list(filter, Page::new(limit, offset)).await?)
    }

    /// Operational `logs` rows, newest first.
    pub async fn logs(&self, actor: &User, limit: Option<i64>) -> LaundryResult<Vec<OperationLog>> {
        PermissionChecker::require_staff(actor)?;
        Ok(self.activity.list_logs(Page::new(limit, None)).await?)
    }
}
