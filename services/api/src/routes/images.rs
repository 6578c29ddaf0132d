//! `/images/:id`, kept for older clients

use axum::{Router, routing::get};

use super::{RouteModule, files::get_file};

pub fn module() -> RouteModule {
    RouteModule::new(5, "/images").protected(Router::new().route("/:id", get(get_file)))
}
