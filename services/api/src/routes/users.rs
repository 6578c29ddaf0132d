//! User routes
//!
//! Every route here requires a signed-in user. `POST /` and `GET /@me`
//! carry their own tighter rate limit.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use auth::{
    generate_password, hash_password,
    validation::{validate_email, validate_name, validate_new_password},
    verify_password,
};
use common::models::{NewUser, Role, User};
use common::pagination::Page;
use common::query::{SortOrder, UserFilter, UserQuery};

use super::{RouteModule, search_term};
use crate::{
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiQuery, page_request, parse_id},
    middleware::{CurrentUser, RateLimit, rate_limit_middleware},
    state::AppState,
};

const NOT_FOUND: &str = "The user you are looking for does not exist.";
/// Length of the password generated for new users
const GENERATED_PASSWORD_LENGTH: usize = 16;

pub fn module(state: &AppState) -> RouteModule {
    let user_limit = middleware::from_fn_with_state(
        RateLimit::new(state.limits.user_requests.clone(), state.jwt.clone()),
        rate_limit_middleware,
    );

    let protected = Router::new()
        .route(
            "/",
            get(list_users).merge(post(create_user).route_layer(user_limit.clone())),
        )
        .route("/@me", get(me).route_layer(user_limit))
        .route("/:id", get(get_user))
        .route("/:id/password/update", post(update_password));

    RouteModule::new(7, "/users").protected(protected)
}

#[derive(Debug, Default, Deserialize)]
pub struct UserListParams {
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<SortOrder>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub role: Role,
}

/// A new user together with the password generated for them.
/// This response is the only place the plaintext password appears.
#[derive(Debug, Serialize)]
pub struct CreatedUser {
    #[serde(flatten)]
    pub user: User,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordUpdateRequest {
    pub password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Paginated users, sorted by first name unless asked otherwise
pub async fn list_users(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<UserListParams>,
) -> ApiResult<Json<Page<User>>> {
    let request = page_request(params.page, params.limit)?;

    let query = UserQuery::new(UserFilter)
        .search(search_term(params.search)?)
        .sort_by_name(Some(params.sort.as_deref().unwrap_or("name")))
        .order(params.order.unwrap_or_default())
        .window(request.window());

    let count = state.stores.users.count(&query).await?;
    let users = if query.window.is_empty() {
        Vec::new()
    } else {
        state.stores.users.list(&query).await?
    };

    Ok(Json(request.into_page(users, count)))
}

fn required(field: &str, value: Option<String>) -> ApiResult<String> {
    let value = value.ok_or_else(|| {
        ApiError::Validation(format!("Missing \"{}\" field from request body.", field))
    })?;
    Ok(value.trim().to_string())
}

/// Create a user with a generated password
pub async fn create_user(
    State(state): State<AppState>,
    CurrentUser(creator): CurrentUser,
    ApiJson(body): ApiJson<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<CreatedUser>)> {
    let first_name = required("firstName", body.first_name)?;
    let last_name = required("lastName", body.last_name)?;
    let email = required("email", body.email)?;

    validate_name("firstName", &first_name, true).map_err(ApiError::Validation)?;
    validate_name("lastName", &last_name, false).map_err(ApiError::Validation)?;
    validate_email(&email).map_err(ApiError::Validation)?;

    if state.stores.users.find_by_email(&email).await?.is_some() {
        return Err(ApiError::Conflict("User already created.".to_string()));
    }

    let password = generate_password(GENERATED_PASSWORD_LENGTH);
    let password_hash = hash_password(password.clone()).await?;

    let user = state
        .stores
        .users
        .insert(NewUser {
            first_name,
            last_name,
            role: body.role,
            email,
            password_hash,
        })
        .await?;

    info!("User {} created by {}", user.id, creator.id);
    Ok((StatusCode::CREATED, Json(CreatedUser { user, password })))
}

pub async fn me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<User>> {
    let id = parse_id(&id, NOT_FOUND)?;
    state
        .stores
        .users
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(NOT_FOUND.to_string()))
}

/// Change a password after checking the current one.
///
/// Users may only change their own password; admins may change anyone's.
pub async fn update_password(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<PasswordUpdateRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let id = parse_id(&id, NOT_FOUND)?;
    if id != current.0.id && !current.is_admin() {
        return Err(ApiError::Forbidden(
            "You can only change your own password.".to_string(),
        ));
    }

    let target = state
        .stores
        .users
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(NOT_FOUND.to_string()))?;

    let (password, new_password) = match (body.password, body.new_password) {
        (Some(password), Some(new_password)) if !password.is_empty() && !new_password.is_empty() => {
            (password, new_password)
        }
        _ => return Err(ApiError::Validation("Invalid body provided".to_string())),
    };
    if password == new_password {
        return Err(ApiError::Validation(
            "Passwords have to be different".to_string(),
        ));
    }

    let credentials = state
        .stores
        .users
        .credentials(&target.email)
        .await?
        .ok_or_else(|| ApiError::NotFound(NOT_FOUND.to_string()))?;
    if !verify_password(password, credentials.password).await? {
        return Err(ApiError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }

    validate_new_password(&new_password).map_err(ApiError::Validation)?;

    let password_hash = hash_password(new_password).await?;
    if !state.stores.users.update_password(target.id, &password_hash).await? {
        return Err(ApiError::NotFound(NOT_FOUND.to_string()));
    }

    info!("Password changed for user {}", target.id);
    Ok(Json(MessageResponse {
        message: "The password was changed successfully",
    }))
}
