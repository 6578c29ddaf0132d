//! Root route

use axum::{Router, http::StatusCode, routing::get};

use super::RouteModule;

pub fn module() -> RouteModule {
    RouteModule::new(0, "/").public(Router::new().route("/", get(index)))
}

/// Empty 200, used by uptime checks
pub async fn index() -> StatusCode {
    StatusCode::OK
}
