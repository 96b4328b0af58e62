use axum::{
    Router,
    extract::FromRef,
    routing::{get, patch},
};
use serde::de::DeserializeOwned;

use crate::{
    AppState, handlers,
    models::{Camp, Goal, Material, Product, Task},
    repository::{RepositoryState, Resource},
};

/// API Router Module
///
/// Mounts one CRUD router per resource plus the health probe, all under `/api`.
///
/// Access Control:
/// The route guard passes `/api/` through unconditionally, so nothing here is gated by
/// the session cookies.
pub fn api_routes() -> Router<AppState> {
    let resources = Router::new()
        // GET /api/health
        .route("/health", get(handlers::health))
        // /api/materials, /api/materials/{id}
        .nest("/materials", resource_routes::<Material>())
        .nest("/products", resource_routes::<Product>())
        // Camps hard-delete; the rest soft-delete.
        .nest("/camps", resource_routes::<Camp>())
        .nest("/goals", resource_routes::<Goal>())
        .nest("/tasks", resource_routes::<Task>());

    Router::new().nest("/api", resources)
}

/// resource_routes
///
/// `GET`/`POST` on the collection, `PATCH`/`DELETE` on a single row.
pub fn resource_routes<R>() -> Router<AppState>
where
    R: Resource,
    R::Create: DeserializeOwned,
    R::Update: DeserializeOwned,
    RepositoryState<R>: FromRef<AppState>,
{
    Router::new()
        .route(
            "/",
            get(handlers::list_resources::<R>).post(handlers::create_resource::<R>),
        )
        .route(
            "/{id}",
            patch(handlers::update_resource::<R>).delete(handlers::delete_resource::<R>),
        )
}
