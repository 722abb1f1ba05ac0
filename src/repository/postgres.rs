use async_trait::async_trait;
use sqlx::PgPool;

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

const USER_COLUMNS: &str =
    "id, username, password_hash, first_name, last_name, email, is_staff, date_joined";
const POST_COLUMNS: &str = "id, title, description, poster_id, image, created_at";
const PROFILE_COLUMNS: &str = "id, user_id, dob, country, aboutme";

/// PostgresRepository
///
/// Production implementation over a `PgPool`. Uniqueness and cascades are enforced by
/// the schema in `migrations/`, never by read-then-write checks here.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Translates driver errors, recognising unique violations by constraint name.
fn map_db_error(op: &str, err: sqlx::Error) -> RepoError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            match db.constraint() {
                Some("users_username_key") => {
                    return RepoError::UniqueViolation { field: "username" };
                }
                Some("profiles_user_id_key") => return RepoError::UniqueViolation { field: "user" },
                _ => {}
            }
        }
        if db.is_foreign_key_violation() {
            tracing::warn!("{} referenced a missing user", op);
            return RepoError::MissingOwner;
        }
    }
    tracing::error!("{} error: {:?}", op, err);
    RepoError::Database(err)
}

#[async_trait]
impl UserRepository for PostgresRepository {
    async fn list_users(&self) -> RepoResult<Vec<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id ASC"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error("list_users", e))
    }

    async fn find_user(&self, id: i64) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error("find_user", e))
    }

    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error("find_user_by_username", e))
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, password_hash, first_name, last_name, email, is_staff) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {USER_COLUMNS}"
        ))
        .bind(user.username)
        .bind(user.password_hash)
        .bind(user.first_name)
        .bind(user.last_name)
        .bind(user.email)
        .bind(user.is_staff)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_error("create_user", e))
    }

    /// Only columns whose change is `Some` are written (`COALESCE`).
    async fn update_user(&self, id: i64, changes: UserUpdate) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET username = COALESCE($2, username),
                password_hash = COALESCE($3, password_hash),
                first_name = COALESCE($4, first_name),
                last_name = COALESCE($5, last_name),
                email = COALESCE($6, email)
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.username)
        .bind(changes.password_hash)
        .bind(changes.first_name)
        .bind(changes.last_name)
        .bind(changes.email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error("update_user", e))
    }

    /// Profile, posts and token rows go with it via `ON DELETE CASCADE`.
    async fn delete_user(&self, id: i64) -> RepoResult<bool> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map(|res| res.rows_affected() > 0)
            .map_err(|e| map_db_error("delete_user", e))
    }
}

#[async_trait]
impl PostRepository for PostgresRepository {
    async fn list_posts(&self) -> RepoResult<Vec<Post>> {
        sqlx::query_as::<_, Post>(&format!("SELECT {POST_COLUMNS} FROM posts ORDER BY id ASC"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error("list_posts", e))
    }

    async fn list_posts_by_poster(&self, poster: i64) -> RepoResult<Vec<Post>> {
        sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE poster_id = $1 ORDER BY id ASC"
        ))
        .bind(poster)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_db_error("list_posts_by_poster", e))
    }

    async fn find_post(&self, id: i64) -> RepoResult<Option<Post>> {
        sqlx::query_as::<_, Post>(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error("find_post", e))
    }

    async fn create_post(&self, poster: i64, post: NewPost) -> RepoResult<Post> {
        sqlx::query_as::<_, Post>(&format!(
            "INSERT INTO posts (title, description, poster_id, image) \
             VALUES ($1, $2, $3, $4) RETURNING {POST_COLUMNS}"
        ))
        .bind(post.title)
        .bind(post.description)
        .bind(poster)
        .bind(post.image)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_error("create_post", e))
    }

    /// `poster_id` is not in the SET list: it cannot change after creation.
    async fn update_post(&self, id: i64, changes: PostUpdate) -> RepoResult<Option<Post>> {
        let set_image = changes.image.is_some();
        sqlx::query_as::<_, Post>(&format!(
            r#"
            UPDATE posts
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                image = CASE WHEN $4 THEN $5 ELSE image END
            WHERE id = $1
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.title)
        .bind(changes.description)
        .bind(set_image)
        .bind(changes.image.flatten())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error("update_post", e))
    }

    async fn delete_post(&self, id: i64) -> RepoResult<bool> {
        sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map(|res| res.rows_affected() > 0)
            .map_err(|e| map_db_error("delete_post", e))
    }
}

#[async_trait]
impl ProfileRepository for PostgresRepository {
    async fn list_profiles(&self) -> RepoResult<Vec<UserProfile>> {
        sqlx::query_as::<_, UserProfile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles ORDER BY id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_db_error("list_profiles", e))
    }

    async fn find_profile(&self, id: i64) -> RepoResult<Option<UserProfile>> {
        sqlx::query_as::<_, UserProfile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error("find_profile", e))
    }

    /// Relies on `profiles_user_id_key`; two racing creates cannot both succeed.
    async fn create_profile(&self, user: i64, profile: NewProfile) -> RepoResult<UserProfile> {
        sqlx::query_as::<_, UserProfile>(&format!(
            "INSERT INTO profiles (user_id, dob, country, aboutme) \
             VALUES ($1, $2, $3, $4) RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(user)
        .bind(profile.dob)
        .bind(profile.country)
        .bind(profile.aboutme)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_error("create_profile", e))
    }

    async fn update_profile(&self, id: i64, changes: ProfileUpdate) -> RepoResult<Option<UserProfile>> {
        let set_dob = changes.dob.is_some();
        sqlx::query_as::<_, UserProfile>(&format!(
            r#"
            UPDATE profiles
            SET dob = CASE WHEN $2 THEN $3 ELSE dob END,
                country = COALESCE($4, country),
                aboutme = COALESCE($5, aboutme)
            WHERE id = $1
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(set_dob)
        .bind(changes.dob.flatten())
        .bind(changes.country)
        .bind(changes.aboutme)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error("update_profile", e))
    }

    async fn delete_profile(&self, id: i64) -> RepoResult<bool> {
        sqlx::query("DELETE FROM profiles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map(|res| res.rows_affected() > 0)
            .map_err(|e| map_db_error("delete_profile", e))
    }
}

#[async_trait]
impl TokenRepository for PostgresRepository {
    /// Insert-if-absent then read back, so concurrent logins converge on one key.
    async fn get_or_create_token(&self, user_id: i64) -> RepoResult<String> {
        sqlx::query(
            "INSERT INTO auth_tokens (key, user_id) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(generate_token_key())
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_db_error("insert token", e))?;

        sqlx::query_scalar::<_, String>("SELECT key FROM auth_tokens WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error("select token", e))
    }

    async fn find_user_by_token(&self, key: &str) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.username, u.password_hash, u.first_name, u.last_name,
                   u.email, u.is_staff, u.date_joined
            FROM auth_tokens t
            JOIN users u ON u.id = t.user_id
            WHERE t.key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error("find_user_by_token", e))
    }
}
