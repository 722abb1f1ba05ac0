use axum::{Json, extract::State};

use super::Payload;
use crate::{
    AppState,
    error::{ApiError, FieldErrors},
    models::{TokenRequest, TokenResponse},
    password::verify_password_or_dummy,
    policy::{Action, Resource},
    repository::{TokenRepository, UserRepository},
    validation::{BLANK, REQUIRED},
};

/// obtain_token
///
/// [Public Route] Exchanges a username and password for the user's opaque token. The same
/// key is returned on every successful login until the user is deleted. An unknown
/// username and a wrong password produce the identical 400 body.
#[utoipa::path(
    post,
    path = "/auth-token/",
    tag = "auth",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, description = "Missing fields or invalid credentials")
    )
)]
pub async fn obtain_token(
    State(state): State<AppState>,
    Payload(credentials): Payload<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    state.policy().check(None, Action::Create, Resource::Token)?;

    let mut errors = FieldErrors::new();
    for (field, value) in [("username", &credentials.username), ("password", &credentials.password)] {
        match value {
            None => errors.add(field, REQUIRED),
            Some(v) if v.is_empty() => errors.add(field, BLANK),
            Some(_) => {}
        }
    }
    let (username, password) = errors.into_result((
        credentials.username.unwrap_or_default(),
        credentials.password.unwrap_or_default(),
    ))?;

    // Unknown usernames still run a full argon2 check so timing does not reveal them.
    let user = state.repo.find_user_by_username(&username).await?;
    let hash = user.as_ref().map(|u| u.password_hash.as_str());
    let verified = verify_password_or_dummy(&password, hash)?;

    let user = match user {
        Some(user) if verified => user,
        Some(user) => {
            tracing::warn!(user_id = user.id, "token request with wrong password");
            return Err(ApiError::invalid_credentials());
        }
        None => {
            tracing::warn!("token request for unknown username");
            return Err(ApiError::invalid_credentials());
        }
    };

    let token = state.repo.get_or_create_token(user.id).await?;
    tracing::debug!(user_id = user.id, "token issued");
    Ok(Json(TokenResponse { token }))
}
