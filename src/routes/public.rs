use crate::{
    AppState,
    handlers::{token, users},
};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints open to anonymous callers. Everything else requires a token.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /users/create/
        // Self-service signup.
        .route("/users/create/", post(users::create_user))
        // POST /auth-token/
        // Credentials in, opaque token out.
        .route("/auth-token/", post(token::obtain_token))
}
