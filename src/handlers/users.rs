use axum::{Json, extract::State, http::StatusCode};

use super::{Payload, ResourceId};
use crate::{
    AppState,
    auth::AuthUser,
    error::ApiError,
    models::{NewUser, User, UserPayload, UserResponse, UserUpdate},
    password::hash_password,
    policy::{Action, Resource},
    repository::UserRepository,
    validation::WriteMode,
};

/// list_users
///
/// [Authenticated Route] Every user, id ascending, without credentials.
#[utoipa::path(
    get,
    path = "/users/",
    tag = "users",
    responses(
        (status = 200, description = "All users", body = [UserResponse]),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_users(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    state.policy().check(Some(&auth), Action::List, Resource::Users)?;
    let users = state.repo.list_users().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// create_user
///
/// [Public Route] Self-service signup. The password is hashed before it is stored and is
/// never part of the response. A taken username is reported by the store's unique
/// constraint and surfaces as a `username` field error.
#[utoipa::path(
    post,
    path = "/users/create/",
    tag = "users",
    request_body = UserPayload,
    responses(
        (status = 201, description = "Created", body = UserResponse),
        (status = 400, description = "Validation error")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    Payload(payload): Payload<UserPayload>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    state.policy().check(None, Action::Create, Resource::Users)?;

    let valid = payload.validate(WriteMode::Create)?;
    let password_hash = hash_password(valid.password.as_deref().unwrap_or_default())?;

    let user = state
        .repo
        .create_user(NewUser {
            username: valid.username.unwrap_or_default(),
            password_hash,
            first_name: valid.first_name.unwrap_or_default(),
            last_name: valid.last_name.unwrap_or_default(),
            email: valid.email.unwrap_or_default(),
            is_staff: false,
        })
        .await?;

    tracing::info!(user_id = user.id, "user created");
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// retrieve_user
///
/// [Authenticated Route] Public fields of any user.
#[utoipa::path(
    get,
    path = "/users/{id}/",
    tag = "users",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Found", body = UserResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn retrieve_user(
    auth: AuthUser,
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
) -> Result<Json<UserResponse>, ApiError> {
    let user = load_user(&state, id).await?;
    state
        .policy()
        .check(Some(&auth), Action::Retrieve, Resource::User { id: user.id })?;
    Ok(Json(UserResponse::from(user)))
}

/// update_user
///
/// [Authenticated Route] Full update (PUT). Self or staff only. `username` and `password`
/// are required; a new password is re-hashed and replaces the old hash.
#[utoipa::path(
    put,
    path = "/users/{id}/",
    tag = "users",
    params(("id" = i64, Path, description = "User ID")),
    request_body = UserPayload,
    responses(
        (status = 200, description = "Updated", body = UserResponse),
        (status = 403, description = "Not self or staff"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_user(
    auth: AuthUser,
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
    Payload(payload): Payload<UserPayload>,
) -> Result<Json<UserResponse>, ApiError> {
    apply_update(auth, &state, id, payload, WriteMode::Replace).await
}

/// partial_update_user
///
/// [Authenticated Route] PATCH: only the submitted fields change.
#[utoipa::path(
    patch,
    path = "/users/{id}/",
    tag = "users",
    params(("id" = i64, Path, description = "User ID")),
    request_body = UserPayload,
    responses(
        (status = 200, description = "Updated", body = UserResponse),
        (status = 403, description = "Not self or staff"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn partial_update_user(
    auth: AuthUser,
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
    Payload(payload): Payload<UserPayload>,
) -> Result<Json<UserResponse>, ApiError> {
    apply_update(auth, &state, id, payload, WriteMode::Partial).await
}

/// delete_user
///
/// [Authenticated Route] Self or staff only. The user's profile, posts and token go too.
#[utoipa::path(
    delete,
    path = "/users/{id}/",
    tag = "users",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not self or staff"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_user(
    auth: AuthUser,
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
) -> Result<StatusCode, ApiError> {
    let user = load_user(&state, id).await?;
    state
        .policy()
        .check(Some(&auth), Action::Destroy, Resource::User { id: user.id })?;

    if !state.repo.delete_user(user.id).await? {
        return Err(ApiError::NotFound);
    }
    tracing::info!(user_id = user.id, actor = auth.id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn load_user(state: &AppState, id: i64) -> Result<User, ApiError> {
    state.repo.find_user(id).await?.ok_or(ApiError::NotFound)
}

async fn apply_update(
    auth: AuthUser,
    state: &AppState,
    id: i64,
    payload: UserPayload,
    mode: WriteMode,
) -> Result<Json<UserResponse>, ApiError> {
    let user = load_user(state, id).await?;
    let action = match mode {
        WriteMode::Partial => Action::PartialUpdate,
        _ => Action::Update,
    };
    state
        .policy()
        .check(Some(&auth), action, Resource::User { id: user.id })?;

    let valid = payload.validate(mode)?;
    let password_hash = match valid.password.as_deref() {
        Some(plain) => Some(hash_password(plain)?),
        None => None,
    };

    let changes = UserUpdate {
        username: valid.username,
        password_hash,
        first_name: valid.first_name,
        last_name: valid.last_name,
        email: valid.email,
    };

    let updated = state
        .repo
        .update_user(user.id, changes)
        .await?
        .ok_or(ApiError::NotFound)?;

    tracing::info!(user_id = updated.id, actor = auth.id, "user updated");
    Ok(Json(UserResponse::from(updated)))
}
