use std::{path::Path, sync::Arc};

use axum::{Router, extract::FromRef, http::HeaderName};
use sqlx::PgPool;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod resources;
pub mod routes;

use models::{Camp, Goal, Material, Product, Task};
use routes::api;

// --- Public Re-exports ---

pub use auth::{Session, SessionResolver};
pub use config::AppConfig;
pub use repository::{MemoryRepository, PostgresRepository, Repository, RepositoryState};

/// ApiDoc
///
/// OpenAPI document served at `/api-docs/openapi.json`. The resource endpoints share one
/// generic handler set, so their payload schemas are registered as components.
#[derive(OpenApi)]
#[openapi(
    paths(handlers::health),
    components(
        schemas(
            models::Material, models::CreateMaterialRequest, models::UpdateMaterialRequest,
            models::Product, models::CreateProductRequest, models::UpdateProductRequest,
            models::Camp, models::CreateCampRequest, models::UpdateCampRequest,
            models::Goal, models::CreateGoalRequest, models::UpdateGoalRequest,
            models::Task, models::CreateTaskRequest, models::UpdateTaskRequest,
            models::HealthResponse, error::ErrorResponse,
        )
    ),
    tags(
        (name = "vico-dashboard", description = "Business strategy dashboard API")
    )
)]
struct ApiDoc;

/// StorageKind
///
/// Which backend the repositories were built on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageKind {
    Postgres,
    Memory,
}

impl StorageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StorageKind::Postgres => "postgres",
            StorageKind::Memory => "memory",
        }
    }
}

/// Repositories
///
/// One repository handle per resource, all scoped to the same owner.
#[derive(Clone)]
pub struct Repositories {
    pub materials: RepositoryState<Material>,
    pub products: RepositoryState<Product>,
    pub camps: RepositoryState<Camp>,
    pub goals: RepositoryState<Goal>,
    pub tasks: RepositoryState<Task>,
}

impl Repositories {
    pub fn postgres(pool: PgPool, owner_id: &str) -> Self {
        Self {
            materials: Arc::new(PostgresRepository::<Material>::new(pool.clone(), owner_id)),
            products: Arc::new(PostgresRepository::<Product>::new(pool.clone(), owner_id)),
            camps: Arc::new(PostgresRepository::<Camp>::new(pool.clone(), owner_id)),
            goals: Arc::new(PostgresRepository::<Goal>::new(pool.clone(), owner_id)),
            tasks: Arc::new(PostgresRepository::<Task>::new(pool, owner_id)),
        }
    }

    pub fn memory(owner_id: &str) -> Self {
        let goals = Arc::new(MemoryRepository::<Goal>::new(owner_id));
        Self {
            materials: Arc::new(MemoryRepository::<Material>::new(owner_id)),
            products: Arc::new(MemoryRepository::<Product>::new(owner_id)),
            camps: Arc::new(MemoryRepository::<Camp>::new(owner_id)),
            // Task goal links are checked against this same goal store.
            tasks: Arc::new(MemoryRepository::<Task>::new(owner_id).with_parents(goals.clone())),
            goals,
        }
    }
}

/// AppState
///
/// Shared, cheaply clonable container for everything a request may need.
#[derive(Clone)]
pub struct AppState {
    pub repos: Repositories,
    pub storage: StorageKind,
    pub session: SessionResolver,
    pub config: AppConfig,
}

impl AppState {
    /// State over in-memory repositories, with the session mode taken from `config`.
    pub fn in_memory(config: AppConfig) -> Self {
        Self {
            repos: Repositories::memory(&config.owner_id),
            storage: StorageKind::Memory,
            session: SessionResolver::new(config.session_mode, config.session_secret.clone()),
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState<Material> {
    fn from_ref(state: &AppState) -> Self {
        state.repos.materials.clone()
    }
}

impl FromRef<AppState> for RepositoryState<Product> {
    fn from_ref(state: &AppState) -> Self {
        state.repos.products.clone()
    }
}

impl FromRef<AppState> for RepositoryState<Camp> {
    fn from_ref(state: &AppState) -> Self {
        state.repos.camps.clone()
    }
}

impl FromRef<AppState> for RepositoryState<Goal> {
    fn from_ref(state: &AppState) -> Self {
        state.repos.goals.clone()
    }
}

impl FromRef<AppState> for RepositoryState<Task> {
    fn from_ref(state: &AppState) -> Self {
        state.repos.tasks.clone()
    }
}

/// create_router
///
/// Assembles the API, the docs and the static frontend, puts the route guard in front
/// of all of it, then adds the observability and CORS layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    // Client-side routes have no file of their own; they all get the app shell.
    let shell = ServeFile::new(Path::new(&state.config.static_dir).join("index.html"));
    let frontend = ServeDir::new(&state.config.static_dir)
        .append_index_html_on_directories(true)
        .fallback(shell);
    let resolver = state.session.clone();

    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api::api_routes())
        // Pages: anything that is not an API route comes from the built frontend.
        .fallback_service(frontend)
        .with_state(state);

    // The guard decides per path itself; excluded paths pass straight through.
    let app = guard::with_route_guard(app, resolver);

    app.layer(
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
/// Opens the per-request span, tagged with the `x-request-id` set by the layer above.
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
