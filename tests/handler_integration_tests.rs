use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;
use vico_dashboard::{
    AppConfig, AppState, create_router,
    error::RepoError,
    models::{CreateProductRequest, Product, UpdateProductRequest},
    repository::{ListFilter, Repository},
};

// --- MOCK REPOSITORY IMPLEMENTATION ---

/// Product repository whose every call fails with the configured error, counting calls.
struct FailingProducts {
    calls: AtomicUsize,
    kind: fn() -> RepoError,
}

impl FailingProducts {
    fn new(kind: fn() -> RepoError) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            kind,
        })
    }

    fn fail<T>(&self) -> Result<T, RepoError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err((self.kind)())
    }
}

#[async_trait]
impl Repository<Product> for FailingProducts {
    async fn list(&self, _filter: ListFilter) -> Result<Vec<Product>, RepoError> {
        self.fail()
    }
    async fn create(&self, _fields: CreateProductRequest) -> Result<Product, RepoError> {
        self.fail()
    }
    async fn update(&self, _id: Uuid, _patch: UpdateProductRequest) -> Result<Product, RepoError> {
        self.fail()
    }
    async fn delete(&self, _id: Uuid) -> Result<(), RepoError> {
        self.fail()
    }
}

fn app_with(products: Arc<FailingProducts>) -> axum::Router {
    let mut state = AppState::in_memory(AppConfig::default());
    state.repos.products = products;
    create_router(state)
}

async fn call(app: axum::Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

// --- Tests ---

#[tokio::test]
async fn test_database_error_maps_to_500_without_detail() {
    let repo = FailingProducts::new(|| RepoError::Database(sqlx::Error::PoolTimedOut));
    let app = app_with(repo.clone());

    let (status, body) = call(app, "GET", "/api/products", None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "database_error");
    assert_eq!(body["message"], "internal storage failure");
    assert_eq!(repo.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_not_found_maps_to_404() {
    let repo = FailingProducts::new(|| RepoError::NotFound);
    let app = app_with(repo.clone());

    let uri = format!("/api/products/{}", Uuid::new_v4());
    let (status, body) = call(app.clone(), "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = call(app, "PATCH", &uri, Some(r#"{"name":"x"}"#)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(repo.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_validation_maps_to_400_with_message() {
    let repo = FailingProducts::new(|| RepoError::Validation("name must not be blank".into()));
    let app = app_with(repo);

    let (status, body) = call(app, "POST", "/api/products", Some(r#"{"name":"","price_cents":1}"#)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["message"], "invalid input: name must not be blank");
}

#[tokio::test]
async fn test_malformed_payload_never_reaches_repository() {
    let repo = FailingProducts::new(|| RepoError::NotFound);
    let app = app_with(repo.clone());

    let (status, _) = call(app.clone(), "POST", "/api/products", Some(r#"{"price_cents":"ten"}"#)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = call(app, "DELETE", "/api/products/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(repo.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_other_resources_are_unaffected() {
    let repo = FailingProducts::new(|| RepoError::NotFound);
    let app = app_with(repo);

    let (status, body) = call(app, "GET", "/api/goals", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Array(vec![]));
}
