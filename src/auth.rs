use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};

use crate::{
    error::{ApiError, INVALID_TOKEN, NOT_AUTHENTICATED},
    repository::{RepositoryState, TokenRepository},
};

/// AuthUser Extractor Result
///
/// The resolved identity of an authenticated request. Handlers take it as their first
/// argument and pass it to the `Policy` together with the loaded target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    /// Primary key of the caller in `users`.
    pub id: i64,
    /// Staff identities bypass ownership checks on mutation.
    pub is_staff: bool,
}

/// Pulls the opaque key out of an `Authorization` header value.
///
/// Accepts the `Token <key>` convention and `Bearer <key>`. Anything else, including a
/// scheme with no key or a key containing spaces, yields `None`.
pub fn parse_authorization(value: &str) -> Option<&str> {
    let (scheme, key) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("token") && !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let key = key.trim();
    if key.is_empty() || key.contains(char::is_whitespace) {
        return None;
    }
    Some(key)
}

/// AuthUser Extractor Implementation
///
/// 0. Reuse an identity already resolved by the auth middleware for this request.
/// 1. Read the `Authorization` header. Missing: "credentials were not provided".
/// 2. Parse the scheme and key. Malformed: "Invalid token.".
/// 3. Resolve the key through the token store. Unknown key or deleted user: "Invalid token.".
///
/// Rejection: `ApiError::Unauthenticated` (401 with `WWW-Authenticate: Token`).
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(resolved) = parts.extensions.get::<AuthUser>() {
            return Ok(*resolved);
        }

        let repo = RepositoryState::from_ref(state);

        let Some(raw) = parts.headers.get(header::AUTHORIZATION) else {
            return Err(ApiError::Unauthenticated(NOT_AUTHENTICATED));
        };

        let key = raw
            .to_str()
            .ok()
            .and_then(parse_authorization)
            .ok_or(ApiError::Unauthenticated(INVALID_TOKEN))?;

        // Lookups join on `users`, so a token whose user was deleted no longer resolves.
        match repo.find_user_by_token(key).await? {
            Some(user) => Ok(AuthUser {
                id: user.id,
                is_staff: user.is_staff,
            }),
            None => {
                tracing::debug!("rejected unknown token");
                Err(ApiError::Unauthenticated(INVALID_TOKEN))
            }
        }
    }
}
