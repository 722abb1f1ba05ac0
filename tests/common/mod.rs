#![allow(dead_code)]

use std::sync::Arc;

use postboard::{
    AppConfig, AppState, InMemoryRepository, MockStorageService, ProfileAccess,
    auth::AuthUser,
    models::{NewUser, User},
    password::hash_password,
    repository::{RepositoryState, TokenRepository, UserRepository},
    storage::StorageState,
};

/// A seeded user plus the credentials tests need to act as them.
pub struct TestUser {
    pub user: User,
    pub password: String,
    pub token: String,
}

impl TestUser {
    pub fn auth(&self) -> AuthUser {
        AuthUser {
            id: self.user.id,
            is_staff: self.user.is_staff,
        }
    }

    pub fn header(&self) -> String {
        format!("Token {}", self.token)
    }
}

pub fn state_with(profile_access: ProfileAccess) -> AppState {
    AppState {
        repo: Arc::new(InMemoryRepository::new()) as RepositoryState,
        storage: Arc::new(MockStorageService::new()) as StorageState,
        config: AppConfig {
            profile_access,
            ..AppConfig::default()
        },
    }
}

pub fn test_state() -> AppState {
    state_with(ProfileAccess::Open)
}

pub fn failing_storage_state() -> AppState {
    AppState {
        storage: Arc::new(MockStorageService::new_failing()) as StorageState,
        ..test_state()
    }
}

async fn seed(state: &AppState, username: &str, is_staff: bool) -> TestUser {
    let password = format!("{}-pass", username);
    let user = state
        .repo
        .create_user(NewUser {
            username: username.to_string(),
            password_hash: hash_password(&password).expect("hash"),
            first_name: String::new(),
            last_name: String::new(),
            email: format!("{}@example.com", username),
            is_staff,
        })
        .await
        .expect("seed user");
    let token = state
        .repo
        .get_or_create_token(user.id)
        .await
        .expect("seed token");
    TestUser {
        user,
        password,
        token,
    }
}

pub async fn seed_user(state: &AppState, username: &str) -> TestUser {
    seed(state, username, false).await
}

pub async fn seed_staff(state: &AppState, username: &str) -> TestUser {
    seed(state, username, true).await
}
