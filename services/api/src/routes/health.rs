//! Health check route

use axum::{
    Json, Router,
    http::header,
    response::IntoResponse,
    routing::get,
};
use chrono::{Duration, Utc};
use serde::Serialize;

use super::RouteModule;

const NO_CACHE: &str = "private, max-age=0, no-cache, no-store, must-revalidate";

pub fn module() -> RouteModule {
    RouteModule::new(1, "/health").public(Router::new().route("/", get(health_check)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: &'static str,
    /// Milliseconds since the Unix epoch
    pub latest_check: i64,
}

/// Health check endpoint; never cached
pub async fn health_check() -> impl IntoResponse {
    let now = Utc::now();
    let expires = (now - Duration::seconds(1))
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string();

    (
        [(header::CACHE_CONTROL, NO_CACHE.to_string()), (header::EXPIRES, expires)],
        Json(HealthStatus {
            status: "OK",
            latest_check: now.timestamp_millis(),
        }),
    )
}
