//! Request handlers, one module per resource.
//!
//! Every item handler runs the same fixed pipeline: authenticate (the `AuthUser`
//! extractor), load the target (404), authorize against the loaded record (403),
//! validate the body (400), persist, serialize.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

pub mod posts;
pub mod profiles;
pub mod token;
pub mod uploads;
pub mod users;

/// Payload
///
/// `Json<T>` whose rejection renders as `ApiError::Malformed` instead of axum's plain-text
/// body, so every 400 in the API is JSON.
#[derive(Debug, Clone)]
pub struct Payload<T>(pub T);

impl<S, T> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Payload(value)),
            Err(rejection) => Err(ApiError::Malformed(rejection.body_text())),
        }
    }
}

/// ResourceId
///
/// Integer primary key from the single path segment. Anything that does not parse as an
/// `i64` is answered with 404, as an unmatched integer route would be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceId(pub i64);

impl<S> FromRequestParts<S> for ResourceId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::NotFound)?;
        raw.parse::<i64>().map(ResourceId).map_err(|_| ApiError::NotFound)
    }
}
