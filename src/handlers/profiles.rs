use axum::{Json, extract::State, http::StatusCode};

use super::{Payload, ResourceId};
use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, FieldErrors, RepoError, unique_message},
    models::{ProfilePayload, UserProfile},
    policy::{Action, Resource},
    repository::ProfileRepository,
    validation::WriteMode,
};

/// list_profiles
#[utoipa::path(
    get,
    path = "/profiles/",
    tag = "profiles",
    responses(
        (status = 200, description = "All profiles", body = [UserProfile]),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_profiles(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserProfile>>, ApiError> {
    state.policy().check(Some(&auth), Action::List, Resource::Profiles)?;
    Ok(Json(state.repo.list_profiles().await?))
}

/// create_profile
///
/// [Authenticated Route] Creates the caller's own profile; `user` is taken from the token,
/// never from the body. A second profile for the same user is a 409 and the existing
/// profile is left untouched.
#[utoipa::path(
    post,
    path = "/profiles/create/",
    tag = "profiles",
    request_body = ProfilePayload,
    responses(
        (status = 201, description = "Created", body = UserProfile),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Caller already has a profile")
    )
)]
pub async fn create_profile(
    auth: AuthUser,
    State(state): State<AppState>,
    Payload(payload): Payload<ProfilePayload>,
) -> Result<(StatusCode, Json<UserProfile>), ApiError> {
    state.policy().check(Some(&auth), Action::Create, Resource::Profiles)?;

    let new_profile = payload.into_new_profile()?;
    let profile = match state.repo.create_profile(auth.id, new_profile).await {
        Ok(profile) => profile,
        Err(RepoError::UniqueViolation { field }) => {
            tracing::warn!(user_id = auth.id, "duplicate profile rejected");
            return Err(ApiError::Conflict(FieldErrors::single(field, unique_message(field))));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(profile_id = profile.id, user_id = profile.user, "profile created");
    Ok((StatusCode::CREATED, Json(profile)))
}

/// retrieve_profile
#[utoipa::path(
    get,
    path = "/profiles/{id}/",
    tag = "profiles",
    params(("id" = i64, Path, description = "Profile ID")),
    responses(
        (status = 200, description = "Found", body = UserProfile),
        (status = 404, description = "Not Found")
    )
)]
pub async fn retrieve_profile(
    auth: AuthUser,
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
) -> Result<Json<UserProfile>, ApiError> {
    let profile = load_profile(&state, id).await?;
    state
        .policy()
        .check(Some(&auth), Action::Retrieve, Resource::Profile { user: profile.user })?;
    Ok(Json(profile))
}

/// update_profile
///
/// [Authenticated Route] PUT. Who may do this depends on `PROFILE_MUTATION_POLICY`:
/// any authenticated identity under `open`, owner or staff under `owner`.
#[utoipa::path(
    put,
    path = "/profiles/{id}/",
    tag = "profiles",
    params(("id" = i64, Path, description = "Profile ID")),
    request_body = ProfilePayload,
    responses(
        (status = 200, description = "Updated", body = UserProfile),
        (status = 403, description = "Denied by profile policy"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_profile(
    auth: AuthUser,
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
    Payload(payload): Payload<ProfilePayload>,
) -> Result<Json<UserProfile>, ApiError> {
    apply_update(auth, &state, id, payload, WriteMode::Replace).await
}

/// partial_update_profile
#[utoipa::path(
    patch,
    path = "/profiles/{id}/",
    tag = "profiles",
    params(("id" = i64, Path, description = "Profile ID")),
    request_body = ProfilePayload,
    responses(
        (status = 200, description = "Updated", body = UserProfile),
        (status = 403, description = "Denied by profile policy"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn partial_update_profile(
    auth: AuthUser,
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
    Payload(payload): Payload<ProfilePayload>,
) -> Result<Json<UserProfile>, ApiError> {
    apply_update(auth, &state, id, payload, WriteMode::Partial).await
}

/// delete_profile
#[utoipa::path(
    delete,
    path = "/profiles/{id}/",
    tag = "profiles",
    params(("id" = i64, Path, description = "Profile ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Denied by profile policy"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_profile(
    auth: AuthUser,
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
) -> Result<StatusCode, ApiError> {
    let profile = load_profile(&state, id).await?;
    state
        .policy()
        .check(Some(&auth), Action::Destroy, Resource::Profile { user: profile.user })?;

    if !state.repo.delete_profile(profile.id).await? {
        return Err(ApiError::NotFound);
    }
    tracing::info!(profile_id = profile.id, actor = auth.id, "profile deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn load_profile(state: &AppState, id: i64) -> Result<UserProfile, ApiError> {
    state.repo.find_profile(id).await?.ok_or(ApiError::NotFound)
}

async fn apply_update(
    auth: AuthUser,
    state: &AppState,
    id: i64,
    payload: ProfilePayload,
    mode: WriteMode,
) -> Result<Json<UserProfile>, ApiError> {
    let profile = load_profile(state, id).await?;
    let action = match mode {
        WriteMode::Partial => Action::PartialUpdate,
        _ => Action::Update,
    };
    state
        .policy()
        .check(Some(&auth), action, Resource::Profile { user: profile.user })?;

    let changes = payload.validate(mode)?;
    let updated = state
        .repo
        .update_profile(profile.id, changes)
        .await?
        .ok_or(ApiError::NotFound)?;

    tracing::info!(profile_id = updated.id, actor = auth.id, "profile updated");
    Ok(Json(updated))
}
