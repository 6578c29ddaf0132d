//! Analytics summary route

use axum::{Json, Router, extract::State, routing::get};

use super::RouteModule;
use crate::{
    analytics::{Summary, summarize},
    state::AppState,
};

pub fn module() -> RouteModule {
    RouteModule::new(2, "/analytics").public(Router::new().route("/", get(analytics)))
}

pub async fn analytics(State(state): State<AppState>) -> Json<Summary> {
    Json(summarize(state.analytics.as_ref()).await)
}
