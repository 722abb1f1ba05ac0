use crate::{
    AppState,
    handlers::{posts, profiles, uploads, users},
};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

/// Authenticated Router Module
///
/// Every handler here also takes `AuthUser` itself and passes it to the `Policy`, which
/// makes the ownership decision once the target record has been loaded.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Posts ---
        .route("/posts/", get(posts::list_posts).post(posts::create_post))
        .route("/posts/{id}/", get(posts::retrieve_post))
        // PUT/PATCH /posts/update/{id}
        // Poster or staff only.
        .route(
            "/posts/update/{id}",
            put(posts::update_post).patch(posts::partial_update_post),
        )
        .route("/posts/delete/{id}", delete(posts::delete_post))
        // GET /posts/poster/{poster_id}
        // Falls back to every post when the poster cannot be resolved.
        .route("/posts/poster/{poster_id}", get(posts::list_posts_by_poster))
        // --- Users ---
        .route("/users/", get(users::list_users))
        .route(
            "/users/{id}/",
            get(users::retrieve_user)
                .put(users::update_user)
                .patch(users::partial_update_user)
                .delete(users::delete_user),
        )
        // --- Profiles ---
        .route("/profiles/", get(profiles::list_profiles))
        .route("/profiles/create/", post(profiles::create_profile))
        .route(
            "/profiles/{id}/",
            get(profiles::retrieve_profile)
                .put(profiles::update_profile)
                .patch(profiles::partial_update_profile)
                .delete(profiles::delete_profile),
        )
        // --- Media ---
        // POST /uploads/images/presigned
        // Short-lived upload URL for a post image.
        .route("/uploads/images/presigned", post(uploads::request_image_upload))
}
