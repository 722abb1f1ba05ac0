use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{
    PostRepository, ProfileRepository, RepoResult, TokenRepository, UserRepository,
    generate_token_key,
};
use crate::{
    error::RepoError,
    models::{
        NewPost, NewProfile, NewUser, Post, PostUpdate, ProfileUpdate, User, UserProfile,
        UserUpdate,
    },
};

#[derive(Default)]
struct Store {
    users: BTreeMap<i64, User>,
    posts: BTreeMap<i64, Post>,
    profiles: BTreeMap<i64, UserProfile>,
    // token key -> user id
    tokens: BTreeMap<String, i64>,
    next_user_id: i64,
    next_post_id: i64,
    next_profile_id: i64,
}

impl Store {
    fn next_id(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }

    fn username_taken(&self, username: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| u.username == username && Some(u.id) != except)
    }
}

/// InMemoryRepository
///
/// Process-local store used by the test suite and for running without Postgres.
/// Every operation runs under one lock, so the uniqueness checks below are as race-free
/// as the database constraints they stand in for. Cascades mirror `ON DELETE CASCADE`.
#[derive(Default)]
pub struct InMemoryRepository {
    store: Mutex<Store>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn list_users(&self) -> RepoResult<Vec<User>> {
        Ok(self.store.lock().await.users.values().cloned().collect())
    }

    async fn find_user(&self, id: i64) -> RepoResult<Option<User>> {
        Ok(self.store.lock().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let store = self.store.lock().await;
        Ok(store.users.values().find(|u| u.username == username).cloned())
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let mut store = self.store.lock().await;
        if store.username_taken(&user.username, None) {
            return Err(RepoError::UniqueViolation { field: "username" });
        }
        let id = Store::next_id(&mut store.next_user_id);
        let record = User {
            id,
            username: user.username,
            password_hash: user.password_hash,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            is_staff: user.is_staff,
            date_joined: Utc::now(),
        };
        store.users.insert(id, record.clone());
        Ok(record)
    }

    async fn update_user(&self, id: i64, changes: UserUpdate) -> RepoResult<Option<User>> {
        let mut store = self.store.lock().await;
        if let Some(username) = &changes.username {
            if store.username_taken(username, Some(id)) {
                return Err(RepoError::UniqueViolation { field: "username" });
            }
        }
        let Some(user) = store.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(v) = changes.username {
            user.username = v;
        }
        if let Some(v) = changes.password_hash {
            user.password_hash = v;
        }
        if let Some(v) = changes.first_name {
            user.first_name = v;
        }
        if let Some(v) = changes.last_name {
            user.last_name = v;
        }
        if let Some(v) = changes.email {
            user.email = v;
        }
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: i64) -> RepoResult<bool> {
        let mut store = self.store.lock().await;
        if store.users.remove(&id).is_none() {
            return Ok(false);
        }
        store.posts.retain(|_, p| p.poster != id);
        store.profiles.retain(|_, p| p.user != id);
        store.tokens.retain(|_, user_id| *user_id != id);
        Ok(true)
    }
}

#[async_trait]
impl PostRepository for InMemoryRepository {
    async fn list_posts(&self) -> RepoResult<Vec<Post>> {
        Ok(self.store.lock().await.posts.values().cloned().collect())
    }

    async fn list_posts_by_poster(&self, poster: i64) -> RepoResult<Vec<Post>> {
        let store = self.store.lock().await;
        Ok(store
            .posts
            .values()
            .filter(|p| p.poster == poster)
            .cloned()
            .collect())
    }

    async fn find_post(&self, id: i64) -> RepoResult<Option<Post>> {
        Ok(self.store.lock().await.posts.get(&id).cloned())
    }

    async fn create_post(&self, poster: i64, post: NewPost) -> RepoResult<Post> {
        let mut store = self.store.lock().await;
        if !store.users.contains_key(&poster) {
            return Err(RepoError::MissingOwner);
        }
        let id = Store::next_id(&mut store.next_post_id);
        let record = Post {
            id,
            title: post.title,
            description: post.description,
            poster,
            image: post.image,
            created_at: Utc::now(),
        };
        store.posts.insert(id, record.clone());
        Ok(record)
    }

    async fn update_post(&self, id: i64, changes: PostUpdate) -> RepoResult<Option<Post>> {
        let mut store = self.store.lock().await;
        let Some(post) = store.posts.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(v) = changes.title {
            post.title = v;
        }
        if let Some(v) = changes.description {
            post.description = v;
        }
        if let Some(v) = changes.image {
            post.image = v;
        }
        Ok(Some(post.clone()))
    }

    async fn delete_post(&self, id: i64) -> RepoResult<bool> {
        Ok(self.store.lock().await.posts.remove(&id).is_some())
    }
}

#[async_trait]
impl ProfileRepository for InMemoryRepository {
    async fn list_profiles(&self) -> RepoResult<Vec<UserProfile>> {
        Ok(self.store.lock().await.profiles.values().cloned().collect())
    }

    async fn find_profile(&self, id: i64) -> RepoResult<Option<UserProfile>> {
        Ok(self.store.lock().await.profiles.get(&id).cloned())
    }

    async fn create_profile(&self, user: i64, profile: NewProfile) -> RepoResult<UserProfile> {
        let mut store = self.store.lock().await;
        if store.profiles.values().any(|p| p.user == user) {
            return Err(RepoError::UniqueViolation { field: "user" });
        }
        if !store.users.contains_key(&user) {
            return Err(RepoError::MissingOwner);
        }
        let id = Store::next_id(&mut store.next_profile_id);
        let record = UserProfile {
            id,
            user,
            dob: profile.dob,
            country: profile.country,
            aboutme: profile.aboutme,
        };
        store.profiles.insert(id, record.clone());
        Ok(record)
    }

    async fn update_profile(&self, id: i64, changes: ProfileUpdate) -> RepoResult<Option<UserProfile>> {
        let mut store = self.store.lock().await;
        let Some(profile) = store.profiles.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(v) = changes.dob {
            profile.dob = v;
        }
        if let Some(v) = changes.country {
            profile.country = v;
        }
        if let Some(v) = changes.aboutme {
            profile.aboutme = v;
        }
        Ok(Some(profile.clone()))
    }

    async fn delete_profile(&self, id: i64) -> RepoResult<bool> {
        Ok(self.store.lock().await.profiles.remove(&id).is_some())
    }
}

#[async_trait]
impl TokenRepository for InMemoryRepository {
    async fn get_or_create_token(&self, user_id: i64) -> RepoResult<String> {
        let mut store = self.store.lock().await;
        if let Some((key, _)) = store.tokens.iter().find(|(_, uid)| **uid == user_id) {
            return Ok(key.clone());
        }
        if !store.users.contains_key(&user_id) {
            return Err(RepoError::MissingOwner);
        }
        let key = generate_token_key();
        store.tokens.insert(key.clone(), user_id);
        Ok(key)
    }

    async fn find_user_by_token(&self, key: &str) -> RepoResult<Option<User>> {
        let store = self.store.lock().await;
        Ok(store
            .tokens
            .get(key)
            .and_then(|user_id| store.users.get(user_id))
            .cloned())
    }
}
