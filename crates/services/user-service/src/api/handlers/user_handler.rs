//! User handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Deserializer};
use utoipa::ToSchema;
use validator::Validate;

use common::{AppError, AppResult, OptionExt};
use domain::{
    ProfileUpdate, User, UserResponse, MSG_ID_REQUIRED, MSG_NO_USER_WITH_EMAIL,
    MSG_NO_USER_WITH_ID, MSG_NO_USER_WITH_USERNAME, MSG_USER_ALREADY_EXISTS,
};

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::CurrentUser;
use crate::api::state::AppState;

/// Registration request with validation
///
/// Client supplied `id` and `role` are ignored; new users always get the
/// default role.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Login name
    #[validate(length(min = 1, message = "Username cannot be empty"))]
    #[schema(example = "alice")]
    pub username: String,
    /// User email address
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "alice@example.com")]
    pub email: String,
    #[validate(length(min = 1, message = "Password cannot be empty"))]
    #[schema(example = "secret")]
    pub password: String,
    #[schema(example = "Alice")]
    pub first_name: Option<String>,
    #[schema(example = "Smith")]
    pub last_name: Option<String>,
}

impl From<RegisterRequest> for User {
    fn from(req: RegisterRequest) -> Self {
        User::new(req.username, req.email, req.password).with_names(req.first_name, req.last_name)
    }
}

/// Profile update request
///
/// `username` and `password` must repeat the caller's current values.
/// Omitted `email`, `firstName` and `lastName` keep their stored values.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    /// Id of the record to write
    #[schema(example = 1)]
    pub id: Option<i32>,
    #[schema(example = "alice")]
    pub username: Option<String>,
    #[schema(example = "secret")]
    pub password: Option<String>,
    /// Blank keeps the stored address
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "alice@example.org")]
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

impl From<UpdateUserRequest> for ProfileUpdate {
    fn from(req: UpdateUserRequest) -> Self {
        ProfileUpdate {
            id: req.id,
            username: req.username,
            password: req.password,
            email: req.email,
            first_name: req.first_name,
            last_name: req.last_name,
        }
    }
}

/// Create user routes
///
/// Paths are absolute so the access policy sees full route templates.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(register_user).put(update_user))
        .route("/users/id/:id", get(get_user_by_id).delete(delete_user))
        .route("/users/username/:username", get(get_user_by_username))
        .route("/users/email/:email", get(get_user_by_email))
}

fn user_not_found(id: i32) -> AppError {
    AppError::not_found(format!("User with id: {} not found", id))
}

/// List all users
#[utoipa::path(
    get,
    path = "/users",
    tag = "Users",
    responses(
        (status = 200, description = "List of all users", body = Vec<UserResponse>)
    )
)]
pub async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<UserResponse>>> {
    let users = state.user_service.find_all_users().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Get user by ID
#[utoipa::path(
    get,
    path = "/users/id/{id}",
    tag = "Users",
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User profile", body = UserResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_by_id(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<UserResponse>> {
    let user = state
        .user_service
        .find_by_id(id)
        .await?
        .ok_or_not_found(MSG_NO_USER_WITH_ID)?;

    Ok(Json(UserResponse::from(user)))
}

/// Get user by username
#[utoipa::path(
    get,
    path = "/users/username/{username}",
    tag = "Users",
    params(
        ("username" = String, Path, description = "Login name")
    ),
    responses(
        (status = 200, description = "User profile", body = UserResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_by_username(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Json<UserResponse>> {
    let user = state
        .user_service
        .find_by_username(&username)
        .await?
        .ok_or_not_found(MSG_NO_USER_WITH_USERNAME)?;

    Ok(Json(UserResponse::from(user)))
}

/// Get user by email
#[utoipa::path(
    get,
    path = "/users/email/{email}",
    tag = "Users",
    params(
        ("email" = String, Path, description = "Email address")
    ),
    responses(
        (status = 200, description = "User profile", body = UserResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_by_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> AppResult<Json<UserResponse>> {
    let user = state
        .user_service
        .find_by_email(&email)
        .await?
        .ok_or_not_found(MSG_NO_USER_WITH_EMAIL)?;

    Ok(Json(UserResponse::from(user)))
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/users",
    tag = "Users",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = UserResponse),
        (status = 400, description = "Input validation, added on top of the uniqueness check: empty username or password, or malformed email"),
        (status = 409, description = "Username or email already exists")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let user = state
        .user_service
        .add_user(User::from(req))
        .await?
        .ok_or_else(|| AppError::conflict(MSG_USER_ALREADY_EXISTS))?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Update the caller's profile
#[utoipa::path(
    put,
    path = "/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Target is not the caller's own record"),
        (status = 404, description = "Caller or target not found, or the update was rejected")
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ValidatedJson(req): ValidatedJson<UpdateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    let caller = state
        .user_service
        .find_by_username(&current_user.username)
        .await?
        .ok_or_not_found(MSG_NO_USER_WITH_USERNAME)?;

    let merged = ProfileUpdate::from(req).merge_onto(&caller)?;
    let target_id = merged.id.ok_or_not_found(MSG_ID_REQUIRED)?;

    if state.user_service.find_by_id(target_id).await?.is_none() {
        return Err(user_not_found(target_id));
    }

    if state.strict_update_ownership && !current_user.is_admin() && caller.id != Some(target_id) {
        tracing::warn!(
            username = %current_user.username,
            target_id,
            "Rejected update of another user's record"
        );
        return Err(AppError::Forbidden);
    }

    if !state.user_service.update_user(merged.clone()).await? {
        return Err(user_not_found(target_id));
    }

    Ok(Json(UserResponse::from(merged)))
}

/// Delete user by ID (admin only)
#[utoipa::path(
    delete,
    path = "/users/id/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - Admin only"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    let user = state
        .user_service
        .find_by_id(id)
        .await?
        .ok_or_else(|| user_not_found(id))?;
    let user_id = user.id.ok_or_not_found(MSG_ID_REQUIRED)?;

    if state.user_service.find_by_id(user_id).await?.is_none() {
        return Err(user_not_found(user_id));
    }

    if !state.user_service.delete_user_by_id(user_id).await? {
        return Err(AppError::not_found(format!(
            "User with id: {} does not exist.",
            user_id
        )));
    }

    tracing::info!(id = user_id, by = %current_user.username, "User removed");
    Ok(StatusCode::OK)
}
