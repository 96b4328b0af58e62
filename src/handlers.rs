use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::{
    AppState,
    error::ApiError,
    models::HealthResponse,
    repository::{ListFilter, RepositoryState, Resource},
};

// --- Resource Handlers ---
//
// One generic set of handlers serves every resource. The concrete repository is pulled
// out of `AppState` through `FromRef`, so a route only has to name the resource type.

/// list_resources
///
/// `GET /api/<resource>?include_inactive=&search=`
pub async fn list_resources<R: Resource>(
    State(repo): State<RepositoryState<R>>,
    Query(filter): Query<ListFilter>,
) -> Result<Json<Vec<R>>, ApiError> {
    let rows = repo.list(filter).await?;
    Ok(Json(rows))
}

/// create_resource
///
/// `POST /api/<resource>`. Answers 201 with the stored row.
pub async fn create_resource<R>(
    State(repo): State<RepositoryState<R>>,
    Json(fields): Json<R::Create>,
) -> Result<(StatusCode, Json<R>), ApiError>
where
    R: Resource,
    R::Create: DeserializeOwned,
{
    let row = repo.create(fields).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// update_resource
///
/// `PATCH /api/<resource>/{id}`. Only the fields present in the body change.
pub async fn update_resource<R>(
    State(repo): State<RepositoryState<R>>,
    Path(id): Path<Uuid>,
    Json(patch): Json<R::Update>,
) -> Result<Json<R>, ApiError>
where
    R: Resource,
    R::Update: DeserializeOwned,
{
    let row = repo.update(id, patch).await?;
    Ok(Json(row))
}

/// delete_resource
///
/// `DELETE /api/<resource>/{id}`. Soft or hard depending on the resource.
pub async fn delete_resource<R: Resource>(
    State(repo): State<RepositoryState<R>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    repo.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// health
///
/// Liveness probe. Reports which storage backend is active.
#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        storage: state.storage.as_str().to_string(),
    })
}
