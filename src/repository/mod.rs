use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::RepoError,
    models::{
        NewPost, NewProfile, NewUser, Post, PostUpdate, ProfileUpdate, User, UserProfile,
        UserUpdate,
    },
};

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

pub type RepoResult<T> = Result<T, RepoError>;

/// UserRepository
///
/// Identity records. `create_user` and `update_user` report a taken username as
/// `RepoError::UniqueViolation { field: "username" }`.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// All users, id ascending.
    async fn list_users(&self) -> RepoResult<Vec<User>>;
    async fn find_user(&self, id: i64) -> RepoResult<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    async fn create_user(&self, user: NewUser) -> RepoResult<User>;
    /// `Ok(None)` when the id does not exist.
    async fn update_user(&self, id: i64, changes: UserUpdate) -> RepoResult<Option<User>>;
    /// Removes the user together with their profile, posts and token.
    async fn delete_user(&self, id: i64) -> RepoResult<bool>;
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn list_posts(&self) -> RepoResult<Vec<Post>>;
    async fn list_posts_by_poster(&self, poster: i64) -> RepoResult<Vec<Post>>;
    async fn find_post(&self, id: i64) -> RepoResult<Option<Post>>;
    /// `poster` is always the authenticated caller.
    async fn create_post(&self, poster: i64, post: NewPost) -> RepoResult<Post>;
    async fn update_post(&self, id: i64, changes: PostUpdate) -> RepoResult<Option<Post>>;
    async fn delete_post(&self, id: i64) -> RepoResult<bool>;
}

/// ProfileRepository
///
/// At most one profile per user. A second `create_profile` for the same user fails with
/// `RepoError::UniqueViolation { field: "user" }` and leaves the existing row alone.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn list_profiles(&self) -> RepoResult<Vec<UserProfile>>;
    async fn find_profile(&self, id: i64) -> RepoResult<Option<UserProfile>>;
    async fn create_profile(&self, user: i64, profile: NewProfile) -> RepoResult<UserProfile>;
    async fn update_profile(&self, id: i64, changes: ProfileUpdate) -> RepoResult<Option<UserProfile>>;
    async fn delete_profile(&self, id: i64) -> RepoResult<bool>;
}

#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Returns the user's existing key, or issues one. Keys are reused across logins.
    async fn get_or_create_token(&self, user_id: i64) -> RepoResult<String>;
    async fn find_user_by_token(&self, key: &str) -> RepoResult<Option<User>>;
}

/// Repository
///
/// The full persistence contract handed to handlers through `AppState`.
pub trait Repository: UserRepository + PostRepository + ProfileRepository + TokenRepository {}

impl<T> Repository for T where T: UserRepository + PostRepository + ProfileRepository + TokenRepository {}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// Fresh opaque token key: 32 lowercase hex characters.
pub(crate) fn generate_token_key() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
