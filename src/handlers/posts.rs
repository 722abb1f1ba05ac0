use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use super::{Payload, ResourceId};
use crate::{
    AppState,
    auth::AuthUser,
    error::ApiError,
    models::{Post, PostPayload},
    policy::{Action, Resource},
    repository::{PostRepository, UserRepository},
    validation::WriteMode,
};

/// list_posts
///
/// [Authenticated Route] Every post, id ascending. No pagination.
#[utoipa::path(
    get,
    path = "/posts/",
    tag = "posts",
    responses(
        (status = 200, description = "All posts", body = [Post]),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_posts(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Post>>, ApiError> {
    state.policy().check(Some(&auth), Action::List, Resource::Posts)?;
    Ok(Json(state.repo.list_posts().await?))
}

/// list_posts_by_poster
///
/// [Authenticated Route] Posts by one user. When `poster_id` does not name an existing
/// user (unknown or not an integer) the full, unfiltered list is returned instead of an
/// error or an empty list.
#[utoipa::path(
    get,
    path = "/posts/poster/{poster_id}",
    tag = "posts",
    params(("poster_id" = String, Path, description = "User ID of the poster")),
    responses((status = 200, description = "Posts by poster, or all posts", body = [Post]))
)]
pub async fn list_posts_by_poster(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(poster_id): Path<String>,
) -> Result<Json<Vec<Post>>, ApiError> {
    state.policy().check(Some(&auth), Action::List, Resource::Posts)?;

    let poster = match poster_id.parse::<i64>() {
        Ok(id) => state.repo.find_user(id).await?,
        Err(_) => None,
    };

    let posts = match poster {
        Some(user) => state.repo.list_posts_by_poster(user.id).await?,
        None => {
            tracing::info!(poster_id = %poster_id, "poster not found, returning all posts");
            state.repo.list_posts().await?
        }
    };
    Ok(Json(posts))
}

/// retrieve_post
#[utoipa::path(
    get,
    path = "/posts/{id}/",
    tag = "posts",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Found", body = Post),
        (status = 404, description = "Not Found")
    )
)]
pub async fn retrieve_post(
    auth: AuthUser,
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
) -> Result<Json<Post>, ApiError> {
    let post = load_post(&state, id).await?;
    state
        .policy()
        .check(Some(&auth), Action::Retrieve, Resource::Post { poster: post.poster })?;
    Ok(Json(post))
}

/// create_post
///
/// [Authenticated Route] The stored `poster` is always the caller. A `poster` key in the
/// body is not part of `PostPayload` and is dropped during decoding.
#[utoipa::path(
    post,
    path = "/posts/",
    tag = "posts",
    request_body = PostPayload,
    responses(
        (status = 201, description = "Created", body = Post),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn create_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Payload(payload): Payload<PostPayload>,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    state.policy().check(Some(&auth), Action::Create, Resource::Posts)?;

    let new_post = payload.into_new_post()?;
    let post = state.repo.create_post(auth.id, new_post).await?;

    tracing::info!(post_id = post.id, poster = post.poster, "post created");
    Ok((StatusCode::CREATED, Json(post)))
}

/// update_post
///
/// [Authenticated Route] PUT. Poster or staff only; `poster` never changes.
#[utoipa::path(
    put,
    path = "/posts/update/{id}",
    tag = "posts",
    params(("id" = i64, Path, description = "Post ID")),
    request_body = PostPayload,
    responses(
        (status = 200, description = "Updated", body = Post),
        (status = 403, description = "Not poster or staff"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_post(
    auth: AuthUser,
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
    Payload(payload): Payload<PostPayload>,
) -> Result<Json<Post>, ApiError> {
    apply_update(auth, &state, id, payload, WriteMode::Replace).await
}

/// partial_update_post
#[utoipa::path(
    patch,
    path = "/posts/update/{id}",
    tag = "posts",
    params(("id" = i64, Path, description = "Post ID")),
    request_body = PostPayload,
    responses(
        (status = 200, description = "Updated", body = Post),
        (status = 403, description = "Not poster or staff"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn partial_update_post(
    auth: AuthUser,
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
    Payload(payload): Payload<PostPayload>,
) -> Result<Json<Post>, ApiError> {
    apply_update(auth, &state, id, payload, WriteMode::Partial).await
}

/// delete_post
///
/// [Authenticated Route] Poster or staff only. Responds 204 with no body.
#[utoipa::path(
    delete,
    path = "/posts/delete/{id}",
    tag = "posts",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not poster or staff"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_post(
    auth: AuthUser,
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
) -> Result<StatusCode, ApiError> {
    let post = load_post(&state, id).await?;
    state
        .policy()
        .check(Some(&auth), Action::Destroy, Resource::Post { poster: post.poster })?;

    if !state.repo.delete_post(post.id).await? {
        return Err(ApiError::NotFound);
    }
    tracing::info!(post_id = post.id, actor = auth.id, "post deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn load_post(state: &AppState, id: i64) -> Result<Post, ApiError> {
    state.repo.find_post(id).await?.ok_or(ApiError::NotFound)
}

async fn apply_update(
    auth: AuthUser,
    state: &AppState,
    id: i64,
    payload: PostPayload,
    mode: WriteMode,
) -> Result<Json<Post>, ApiError> {
    let post = load_post(state, id).await?;
    let action = match mode {
        WriteMode::Partial => Action::PartialUpdate,
        _ => Action::Update,
    };
    state
        .policy()
        .check(Some(&auth), action, Resource::Post { poster: post.poster })?;

    let changes = payload.validate(mode)?;
    let updated = state
        .repo
        .update_post(post.id, changes)
        .await?
        .ok_or(ApiError::NotFound)?;

    tracing::info!(post_id = updated.id, actor = auth.id, "post updated");
    Ok(Json(updated))
}
