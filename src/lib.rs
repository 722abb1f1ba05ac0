use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod password;
pub mod policy;
pub mod repository;
pub mod storage;
pub mod validation;

// Routing is split by access level (public vs. authenticated).
pub mod routes;
use auth::AuthUser;
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use config::{AppConfig, ProfileAccess};
pub use error::ApiError;
pub use policy::Policy;
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// OpenAPI document generated from the `#[utoipa::path]` annotations, served as JSON at
/// `/api-docs/openapi.json` and rendered at `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::users::list_users, handlers::users::create_user, handlers::users::retrieve_user,
        handlers::users::update_user, handlers::users::partial_update_user,
        handlers::users::delete_user,
        handlers::posts::list_posts, handlers::posts::list_posts_by_poster,
        handlers::posts::retrieve_post, handlers::posts::create_post, handlers::posts::update_post,
        handlers::posts::partial_update_post, handlers::posts::delete_post,
        handlers::profiles::list_profiles, handlers::profiles::create_profile,
        handlers::profiles::retrieve_profile, handlers::profiles::update_profile,
        handlers::profiles::partial_update_profile, handlers::profiles::delete_profile,
        handlers::token::obtain_token, handlers::uploads::request_image_upload,
    ),
    components(
        schemas(
            models::Post, models::UserProfile, models::UserResponse, models::UserPayload,
            models::PostPayload, models::ProfilePayload, models::TokenRequest,
            models::TokenResponse, models::ImageUploadRequest, models::ImageUploadResponse,
        )
    ),
    tags(
        (name = "postboard", description = "Users, posts and profiles API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// Single shared container for the services every handler needs. Cloned per request;
/// all members are cheap handles.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: Postgres in production, in-memory in tests.
    pub repo: RepositoryState,
    /// Storage Layer: presigned upload URLs for post images.
    pub storage: StorageState,
    /// Configuration: The loaded, immutable environment configuration.
    pub config: AppConfig,
}

impl AppState {
    /// The authorization policy for this deployment.
    pub fn policy(&self) -> Policy {
        Policy::new(self.config.profile_access)
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Guards the authenticated router. If `AuthUser` cannot be resolved the extractor rejects
/// with 401 before path or body extraction runs, so an anonymous caller never sees a 404
/// or 400 from a protected route. The resolved identity is stored in the request
/// extensions, where the handler's `AuthUser` picks it up without another token lookup.
async fn auth_middleware(auth_user: AuthUser, mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(auth_user);
    next.run(request).await
}

/// create_router
///
/// Assembles the routes, the auth layer, the observability stack and CORS.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for every request carrying method, URI and the `x-request-id` set above, so all
/// log lines of one request correlate.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
