use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

// --- Stored Records ---

/// User
///
/// Identity record from the `users` table. Deliberately not `Serialize`: the password
/// hash and staff flag never leave the server. Responses go through `UserResponse`.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    // Staff identities bypass ownership checks on mutation.
    pub is_staff: bool,
    pub date_joined: DateTime<Utc>,
}

/// Post
///
/// Content record from the `posts` table. `poster` is set from the authenticated
/// identity at creation and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Post {
    #[ts(type = "number")]
    pub id: i64,
    pub title: String,
    pub description: String,
    #[sqlx(rename = "poster_id")]
    #[ts(type = "number")]
    pub poster: i64,
    /// Object key under `images/`, if an image is attached.
    pub image: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// UserProfile
///
/// One-to-one extension of a user, from the `profiles` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct UserProfile {
    #[ts(type = "number")]
    pub id: i64,
    #[sqlx(rename = "user_id")]
    #[ts(type = "number")]
    pub user: i64,
    #[ts(type = "string | null")]
    pub dob: Option<NaiveDate>,
    pub country: String,
    pub aboutme: String,
}

// --- Store Inputs ---
// Built by handlers after validation; ownership fields come from the caller's identity.

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_staff: bool,
}

/// Column-wise update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub description: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    // Outer `None`: keep; `Some(None)`: clear; `Some(Some(key))`: replace.
    pub image: Option<Option<String>>,
}

#[derive(Debug, Clone)]
pub struct NewProfile {
    pub dob: Option<NaiveDate>,
    pub country: String,
    pub aboutme: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub dob: Option<Option<NaiveDate>>,
    pub country: Option<String>,
    pub aboutme: Option<String>,
}

// --- Request Payloads (Input Schemas) ---
// None of these carry `id`, `poster`, `user` or `is_staff`: unknown keys in the JSON body
// are dropped by serde, so those fields cannot be set by a client.

/// UserPayload
///
/// Body of signup (`POST /users/create/`) and of `PUT`/`PATCH /users/{id}/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UserPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Write-only. Hashed before it reaches the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// PostPayload
///
/// Body of `POST /posts/` and of `PUT`/`PATCH /posts/update/{id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct PostPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Key returned by the image upload endpoint; `""` removes the image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// ProfilePayload
///
/// Body of `POST /profiles/create/` and of `PUT`/`PATCH /profiles/{id}/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ProfilePayload {
    /// `YYYY-MM-DD`. Absent keeps the stored value; explicit `null` clears it.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, example = "1990-04-21")]
    pub dob: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aboutme: Option<String>,
}

// Distinguishes `"dob": null` (Some(None)) from a missing key (None).
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// TokenRequest
///
/// Credentials exchanged for a bearer token at `POST /auth-token/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct TokenRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// ImageUploadRequest
///
/// Input for requesting a short-lived upload URL for a post image.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ImageUploadRequest {
    #[schema(example = "holiday.jpg")]
    pub filename: String,
    #[schema(example = "image/jpeg")]
    pub file_type: String,
}

// --- Responses (Output Schemas) ---

/// UserResponse
///
/// Public view of a user. There is no password field to leak.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserResponse {
    #[ts(type = "number")]
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TokenResponse {
    pub token: String,
}

/// ImageUploadResponse
///
/// `resource_key` is what the client sends back as a post's `image`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ImageUploadResponse {
    pub upload_url: String,
    pub resource_key: String,
}
