use std::sync::Arc;

use axum::http::HeaderMap;
use cleancycle_auth::Authenticator;
use cleancycle_config::LocaleConfig;
use cleancycle_database::{AuthSession, User};
use cleancycle_laundry::LaundryServices;
use sqlx::SqlitePool;

use crate::{i18n, util::require_bearer, ApiError};

#[derive(Clone)]
pub struct AppState {
    pool: SqlitePool,
    authenticator: Authenticator,
    services: LaundryServices,
    locales: Arc<LocaleConfig>,
}

impl AppState {
    pub fn new(
        pool: SqlitePool,
        authenticator: Authenticator,
        services: LaundryServices,
        locales: LocaleConfig,
    ) -> Self {
        Self {
            pool,
            authenticator,
            services,
            locales: Arc::new(locales),
        }
    }

    pub fn db_pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    pub fn services(&self) -> &LaundryServices {
        &self.services
    }

    pub fn locales(&self) -> &LocaleConfig {
        &self.locales
    }

    pub async fn authenticate(&self, token: &str) -> Result<(User, AuthSession), ApiError> {
        self.authenticator
            .authenticate_token(token)
            .await
            .map_err(ApiError::from)
    }

    /// Resolve the bearer token in `headers` to its user.
    pub async fn current_user(&self, headers: &HeaderMap) -> Result<User, ApiError> {
        let token = require_bearer(headers)?;
        let (user, _) = self.authenticate(&token).await?;
        Ok(user)
    }

    /// Locale used for mail sent on behalf of this request.
    pub fn request_locale(&self, headers: &HeaderMap) -> String {
        i18n::negotiate(headers, &self.locales.supported, &self.locales.default)
    }
}
