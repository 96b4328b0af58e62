use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// RepoError
///
/// Failures of the resource repositories.
#[derive(Debug, Error)]
pub enum RepoError {
    /// No live row with that id for the configured owner.
    #[error("resource not found")]
    NotFound,
    /// The payload was rejected before touching storage.
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// ErrorResponse
///
/// JSON body returned for every failed API call.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Wrapper so handlers can `?` repository errors straight into a response.
#[derive(Debug)]
pub struct ApiError(pub RepoError);

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self.0 {
            RepoError::NotFound => (StatusCode::NOT_FOUND, "not_found", self.0.to_string()),
            RepoError::Validation(_) => {
                (StatusCode::BAD_REQUEST, "validation_error", self.0.to_string())
            }
            RepoError::Database(e) => {
                // Driver detail stays in the logs.
                tracing::error!("database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "internal storage failure".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}
