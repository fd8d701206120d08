use axum::http::{header::AUTHORIZATION, HeaderMap};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::ApiError;

/// The token of an `Authorization: Bearer <token>` header. The scheme is
/// matched case-insensitively.
pub fn require_bearer(headers: &HeaderMap) -> Result<String, ApiError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::unauthorized("missing authorization header"))?
        .to_str()
        .map_err(|_| ApiError::unauthorized("malformed authorization header"))?
        .trim();

    let (scheme, token) = value.split_once(' ').unwrap_or((value, ""));
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(ApiError::unauthorized("invalid authorization scheme"));
    }

    match token.trim() {
        "" => Err(ApiError::unauthorized("missing bearer token")),
        token => Ok(token.to_string()),
    }
}

/// `?limit=&offset=` on list endpoints.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, StatusCode};

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        let token = require_bearer(&headers("bearer  TOKEN123")).expect("token should be extracted");
        assert_eq!(token, "TOKEN123");
    }

    #[test]
    fn rejects_missing_or_foreign_credentials() {
        let missing = require_bearer(&HeaderMap::new()).expect_err("no header");
        assert_eq!(missing.status, StatusCode::UNAUTHORIZED);

        let empty = require_bearer(&headers("Bearer")).expect_err("no token");
        assert!(empty.message.contains("missing bearer token"));

        let basic = require_bearer(&headers("Basic dXNlcjpwYXNz")).expect_err("basic auth");
        assert!(basic.message.contains("scheme"));
    }
}
