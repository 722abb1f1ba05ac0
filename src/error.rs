use std::collections::BTreeMap;

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// FieldErrors
///
/// Field-keyed validation messages, serialized as `{"field": ["message", ...]}`.
/// Keys are kept sorted so responses are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor for a single message on a single field.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    /// Turns accumulated messages into a `Validation` error, or `Ok(value)` if there are none.
    pub fn into_result<T>(self, value: T) -> Result<T, ApiError> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(ApiError::Validation(self))
        }
    }
}

/// RepoError
///
/// Failures surfaced by the persistence layer. Uniqueness is decided by the store itself,
/// so a duplicate insert comes back as `UniqueViolation` rather than being pre-checked.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("unique constraint violated on `{field}`")]
    UniqueViolation { field: &'static str },

    /// The user a new row would belong to no longer exists.
    #[error("owning user does not exist")]
    MissingOwner,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// ApiError
///
/// Every per-request failure. Handlers return `Result<_, ApiError>` and the
/// `IntoResponse` impl renders the structured body.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    /// 401: no identity, or the presented token does not resolve to one.
    #[error("unauthenticated: {0}")]
    Unauthenticated(&'static str),

    /// 403: the caller is known but not entitled.
    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("validation failed")]
    Validation(FieldErrors),

    #[error("conflict")]
    Conflict(FieldErrors),

    /// Body could not be decoded into the request struct.
    #[error("malformed request: {0}")]
    Malformed(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub const NOT_AUTHENTICATED: &str = "Authentication credentials were not provided.";
pub const INVALID_TOKEN: &str = "Invalid token.";
pub const INVALID_CREDENTIALS: &str = "Unable to log in with provided credentials.";

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Validation(_) | ApiError::Malformed(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The login failure body. Identical whether the username exists or not.
    pub fn invalid_credentials() -> Self {
        ApiError::Validation(FieldErrors::single("non_field_errors", INVALID_CREDENTIALS))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::Unauthenticated(detail) => {
                let mut response = (status, Json(json!({ "detail": detail }))).into_response();
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Token"));
                response
            }
            ApiError::Forbidden => (
                status,
                Json(json!({ "detail": "You do not have permission to perform this action." })),
            )
                .into_response(),
            ApiError::NotFound => (status, Json(json!({ "detail": "Not found." }))).into_response(),
            ApiError::Validation(errors) | ApiError::Conflict(errors) => {
                (status, Json(errors)).into_response()
            }
            ApiError::Malformed(detail) => {
                (status, Json(json!({ "detail": detail }))).into_response()
            }
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "internal error");
                (status, Json(json!({ "detail": "A server error occurred." }))).into_response()
            }
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::UniqueViolation { field } => {
                ApiError::Validation(FieldErrors::single(field, unique_message(field)))
            }
            // The caller's own user row vanished after authentication.
            RepoError::MissingOwner => ApiError::Unauthenticated(INVALID_TOKEN),
            RepoError::Database(e) => ApiError::Internal(e.to_string()),
        }
    }
}

pub(crate) fn unique_message(field: &str) -> String {
    match field {
        "username" => "A user with that username already exists.".to_string(),
        "user" => "user profile with this user already exists.".to_string(),
        other => format!("An entry with this {} already exists.", other),
    }
}
