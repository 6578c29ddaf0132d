//! Authentication middleware for bearer token validation
//!
//! Applied as a route layer on every protected router. The token must be
//! valid under the process secret and its subject must still exist; the
//! loaded user is handed to the handler through the request extensions.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use tracing::debug;

use common::models::{Role, User};

use crate::{error::ApiError, state::AppState};

/// The authenticated caller, available to protected handlers
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.0.role == Role::Admin
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("No authorization header provided".to_string()))
    }
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let bearer = match req.headers().typed_get::<Authorization<Bearer>>() {
        Some(bearer) => bearer,
        None if req.headers().contains_key(header::AUTHORIZATION) => {
            return Err(ApiError::Unauthorized("Invalid token".to_string()));
        }
        None => {
            return Err(ApiError::Unauthorized(
                "No authorization header provided".to_string(),
            ));
        }
    };

    let claims = state.jwt.verify(bearer.token()).map_err(|e| {
        debug!("Rejected token: {}", e);
        ApiError::Unauthorized("Invalid token".to_string())
    })?;

    let user = state
        .stores
        .users
        .get(claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User doesn't exist".to_string()))?;

    req.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(req).await)
}
