//! Route registry
//!
//! Every route module exposes a `module` function describing where it is
//! mounted and which of its routes need an authenticated caller. The
//! registry below is the complete list; there is no runtime discovery.

pub mod albums;
pub mod analytics;
pub mod authentication;
pub mod files;
pub mod health;
pub mod images;
pub mod index;
pub mod sitemap;
pub mod users;

use axum::{Router, middleware};
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tracing::debug;

use crate::{
    error::{ApiError, ApiResult},
    middleware::{RateLimit, auth_middleware, rate_limit_middleware, security_headers_middleware},
    state::AppState,
};

/// Longest accepted search term, in characters
pub const SEARCH_MAX_LENGTH: usize = 100;

/// A group of routes mounted under one prefix
pub struct RouteModule {
    /// Mount order
    pub position: u16,
    pub prefix: &'static str,
    pub public: Option<Router<AppState>>,
    /// Routes wrapped with the auth guard
    pub protected: Option<Router<AppState>>,
}

impl RouteModule {
    pub fn new(position: u16, prefix: &'static str) -> Self {
        Self {
            position,
            prefix,
            public: None,
            protected: None,
        }
    }

    pub fn public(mut self, router: Router<AppState>) -> Self {
        self.public = Some(router);
        self
    }

    pub fn protected(mut self, router: Router<AppState>) -> Self {
        self.protected = Some(router);
        self
    }

    /// Single router for the module, guard applied to the protected part
    fn into_router(self, state: &AppState) -> Router<AppState> {
        let mut router = self.public.unwrap_or_default();
        if let Some(protected) = self.protected {
            router = router.merge(protected.route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )));
        }
        router
    }
}

/// Validate a listing search term
pub fn search_term(term: Option<String>) -> ApiResult<Option<String>> {
    match term {
        Some(term) if term.chars().count() > SEARCH_MAX_LENGTH => Err(ApiError::Validation(
            format!("The search term must be at most {} characters long.", SEARCH_MAX_LENGTH),
        )),
        other => Ok(other),
    }
}

/// Every route module of the server
fn registry(state: &AppState) -> Vec<RouteModule> {
    vec![
        index::module(),
        health::module(),
        analytics::module(),
        albums::module(),
        files::module(state),
        images::module(),
        authentication::module(),
        users::module(state),
        sitemap::module(),
    ]
}

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let mut modules = registry(&state);
    modules.sort_by_key(|module| module.position);

    let mut router = Router::new();
    for module in modules {
        let prefix = module.prefix;
        debug!("Mounting {} (position {})", prefix, module.position);
        let routes = module.into_router(&state);
        router = if prefix == "/" {
            router.merge(routes)
        } else {
            router.nest(prefix, routes)
        };
    }

    let global = RateLimit::new(state.limits.global.clone(), state.jwt.clone());
    router
        .layer(middleware::from_fn_with_state(global, rate_limit_middleware))
        .layer(middleware::from_fn(security_headers_middleware))
        .with_state(state)
}

/// Trim trailing slashes before routing, so `/albums/` reaches `/albums`
pub fn normalize_paths(router: Router) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(router)
}
