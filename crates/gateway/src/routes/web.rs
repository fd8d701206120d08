//! The PWA manifest and the locale redirects the web client relies on.

use axum::{
    extract::{Path, State},
    http::{header::LOCATION, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect},
    Json,
};
use serde_json::{json, Value};

use crate::AppState;

#[utoipa::path(
    get,
    path = "/manifest.json",
    tag = "Web",
    responses(
        (status = 200, description = "Web app manifest (application/json)")
    )
)]
pub async fn manifest() -> Json<Value> {
    Json(json!({
        "name": "CleanCycle - Laundry Management System",
        "short_name": "CleanCycle",
        "description": "Smart laundry management system for apartments | Powered by Daniel Soos 2025",
        "start_url": "/",
        "scope": "/",
        "display": "standalone",
        "orientation": "portrait-primary",
        "background_color": "#ffffff",
        "theme_color": "#14b8a6",
        "categories": ["productivity", "utilities"],
        "icons": [
            { "src": "/icon.svg", "sizes": "any", "type": "image/svg+xml", "purpose": "any" },
            { "src": "/icon.svg", "sizes": "any", "type": "image/svg+xml", "purpose": "maskable" }
        ]
    }))
}

#[utoipa::path(
    get,
    path = "/{locale}/manifest.webmanifest",
    tag = "Web",
    params(("locale" = String, Path, description = "Any locale prefix")),
    responses(
        (status = 301, description = "Moved to /manifest.json")
    )
)]
pub async fn localized_manifest(Path(_locale): Path<String>) -> impl IntoResponse {
    (StatusCode::MOVED_PERMANENTLY, [(LOCATION, "/manifest.json")])
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Web",
    responses(
        (status = 307, description = "Redirect to the negotiated locale")
    )
)]
pub async fn locale_redirect(State(state): State<AppState>, headers: HeaderMap) -> Redirect {
    let locale = state.request_locale(&headers);
    Redirect::temporary(&format!("/{locale}"))
}
