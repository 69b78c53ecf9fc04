use axum::{Router, extract::FromRef, http::HeaderName, routing::get};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod accounts;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod mailer;
pub mod models;
pub mod password;
pub mod repository;
pub mod storage;
pub mod upload;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::ApiError;
pub use mailer::MailerState;
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};
pub use storage::{DiskStorage, MockStorageService, S3StorageClient, StorageState};

/// Path under which the disk blob store is served.
pub const UPLOADS_PATH: &str = "/uploads";

/// ApiDoc
///
/// Auto-generates the OpenAPI document from the `#[utoipa::path]` handlers and
/// `ToSchema` models. Served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::accounts::sign_up, handlers::accounts::sign_in,
        handlers::accounts::verify_email, handlers::accounts::logout,
        handlers::profile::get_profile, handlers::profile::update_profile,
        handlers::profile::get_user_role, handlers::profile::dashboard,
        handlers::images::upload_image, handlers::images::get_image,
        handlers::images::get_image_meta, handlers::images::delete_image,
        handlers::admin::admin_home, handlers::admin::superadmin_home,
        handlers::admin::list_users, handlers::admin::update_user_role,
        handlers::admin::delete_user, handlers::admin::create_admin,
        handlers::admin::age_stats, handlers::admin::gender_stats,
        handlers::content::list_events, handlers::content::create_event,
        handlers::content::update_event, handlers::content::delete_event,
        handlers::content::list_categories, handlers::content::replace_categories,
        handlers::content::get_about, handlers::content::update_about,
    ),
    components(
        schemas(
            models::Role, models::UserProfile, models::SignUpRequest, models::SignInRequest,
            models::VerifyEmailRequest, models::UpdateProfileRequest, models::UpdateRoleRequest,
            models::CreateAdminRequest, models::CreateAdminResponse, models::MessageResponse,
            models::TokenResponse, models::RoleResponse, models::AgeGroups,
            models::AgeStatsResponse, models::GenderStatsResponse, models::ImageRecord,
            models::UploadResponse, models::UploadImageForm, models::Event,
            models::CreateEventRequest, models::UpdateEventRequest, models::Category,
            models::CategoryInput, models::CategoriesPayload, models::CategoriesResponse,
            models::AboutImage, models::AboutContent,
        )
    ),
    tags(
        (name = "cavite-venture", description = "Cavite Venture tourism and museum API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// Implements the **Unified State Pattern**: one cheaply cloneable container
/// holding every service and the configuration, shared by all requests.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: accounts, images, events and content.
    pub repo: RepositoryState,
    /// Storage Layer: the blob store holding uploaded image bytes.
    pub storage: StorageState,
    /// Outbound email for verification codes.
    pub mailer: MailerState,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// These let extractors and handlers pull a single component out of AppState.

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

impl FromRef<AppState> for MailerState {
    fn from_ref(app_state: &AppState) -> MailerState {
        app_state.mailer.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the routing tree, applies the role gates and global middleware,
/// and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. API Assembly: each module carries its own gate as a route layer.
    let api = Router::new()
        .merge(public::public_routes())
        .merge(authenticated::authenticated_routes(state.clone()))
        .merge(admin::admin_routes(state.clone()))
        .merge(admin::superadmin_routes(state.clone()));

    let mut router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // GET /health
        // Liveness check for monitoring and load balancers.
        .route("/health", get(|| async { "ok" }))
        .nest("/api", api);

    // Disk-backed uploads are served as static files at the URLs the store hands out.
    if let config::StorageBackend::Disk { root } = &state.config.storage {
        router = router.nest_service(UPLOADS_PATH, ServeDir::new(root));
    }

    let base_router = router.with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: a UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: one span per request, tagged with its id.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation: echo x-request-id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request tracing span with method, URI and the `x-request-id`
/// header, so every log line of one request can be correlated.
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
