//! Login and token verification

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use auth::{validation::validate_email, verify_password};
use common::models::User;

use super::RouteModule;
use crate::{
    error::{ApiError, ApiResult},
    extract::ApiJson,
    middleware::CurrentUser,
    state::AppState,
};

const INVALID_CREDENTIALS: &str = "Invalid credentials.";

pub fn module() -> RouteModule {
    RouteModule::new(6, "/authentication")
        .public(Router::new().route("/login", post(login)))
        .protected(Router::new().route("/verify", get(verify)))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

/// Exchange an email and password for a signed token.
///
/// Unknown emails and wrong passwords get the same 403.
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    validate_email(&body.email).map_err(ApiError::Validation)?;
    if body.password.is_empty() {
        return Err(ApiError::Validation(
            "Missing \"password\" field from request body.".to_string(),
        ));
    }

    let invalid = || ApiError::Forbidden(INVALID_CREDENTIALS.to_string());

    let credentials = state
        .stores
        .users
        .credentials(&body.email)
        .await?
        .ok_or_else(|| {
            debug!("Login attempt for unknown email");
            invalid()
        })?;

    if !verify_password(body.password, credentials.password).await? {
        debug!("Login attempt with a wrong password for {}", credentials.id);
        return Err(invalid());
    }

    let user = state
        .stores
        .users
        .get(credentials.id)
        .await?
        .ok_or_else(invalid)?;

    let token = state.jwt.issue(&user)?;
    info!("User {} signed in", user.id);

    Ok(Json(LoginResponse { token, user }))
}

/// The user behind the presented token
pub async fn verify(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}
